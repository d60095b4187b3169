//! Invariants holding under arbitrary sequences of lifecycle operations.

mod support;

use std::collections::HashMap;

use proptest::prelude::*;
use service::{
    command::{
        CancelListing, DecideApplication, FinalizeListing, WithdrawApplication,
    },
    domain::{application, listing, slot, Application},
    infra::Memory,
    Command as _, Service,
};

use self::support::{
    create_listing, service, stored_applications, stored_listing, submit, user,
};

/// Applicants taking part in a generated scenario.
const APPLICANTS: [&str; 4] = ["alice", "bob", "carol", "dave"];

/// Operation upon a single [`listing::Listing`].
#[derive(Clone, Copy, Debug)]
enum Op {
    Submit(usize),
    Decide(usize, application::Decision),
    Withdraw(usize),
    Finalize,
    Cancel,
}

fn op() -> impl Strategy<Value = Op> {
    let applicant = 0..APPLICANTS.len();
    let decision = prop_oneof![
        Just(application::Decision::Accept),
        Just(application::Decision::Reject),
    ];
    prop_oneof![
        4 => applicant.clone().prop_map(Op::Submit),
        4 => (applicant.clone(), decision)
            .prop_map(|(a, d)| Op::Decide(a, d)),
        1 => applicant.prop_map(Op::Withdraw),
        1 => Just(Op::Finalize),
        1 => Just(Op::Cancel),
    ]
}

fn role() -> impl Strategy<Value = listing::InitiatorRole> {
    prop_oneof![
        Just(listing::InitiatorRole::Tenant),
        Just(listing::InitiatorRole::Landlord),
        Just(listing::InitiatorRole::Platform),
    ]
}

/// Returns the most recent [`Application`] of the provided applicant.
fn latest<'a>(
    applications: &'a [Application],
    applicant: &str,
) -> Option<&'a Application> {
    applications
        .iter()
        .filter(|a| a.applicant_id == user(applicant))
        .max_by_key(|a| a.id)
}

async fn apply(svc: &Service<Memory>, listing_id: listing::Id, op: Op) {
    let applications = stored_applications(svc, listing_id).await;
    match op {
        Op::Submit(i) => {
            drop(svc.execute(submit(listing_id, APPLICANTS[i])).await);
        }
        Op::Decide(i, decision) => {
            if let Some(a) = latest(&applications, APPLICANTS[i]) {
                drop(
                    svc.execute(DecideApplication {
                        application_id: a.id,
                        decider_id: user("owner"),
                        decision,
                    })
                    .await,
                );
            }
        }
        Op::Withdraw(i) => {
            if let Some(a) = latest(&applications, APPLICANTS[i]) {
                drop(
                    svc.execute(WithdrawApplication {
                        application_id: a.id,
                        requester_id: user(APPLICANTS[i]),
                    })
                    .await,
                );
            }
        }
        Op::Finalize => {
            drop(
                svc.execute(FinalizeListing {
                    listing_id,
                    requester_id: user("owner"),
                })
                .await,
            );
        }
        Op::Cancel => {
            drop(
                svc.execute(CancelListing {
                    listing_id,
                    requester_id: user("owner"),
                })
                .await,
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lifecycle_invariants_hold(
        role in role(),
        total_spots in 1_u16..4,
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let (svc, _) = service();
            let listing = svc
                .execute(create_listing("owner", role, total_spots))
                .await
                .unwrap();

            let mut seen_listing = listing.status;
            let mut seen =
                HashMap::<application::Id, application::Status>::new();

            for op in ops {
                apply(&svc, listing.id, op).await;

                let stored = stored_listing(&svc, listing.id).await;
                let applications = stored_applications(&svc, listing.id).await;

                // Listing moves along its state machine edges only.
                if stored.status != seen_listing {
                    assert!(
                        seen_listing.can_become(stored.status),
                        "{seen_listing} -> {}",
                        stored.status,
                    );
                    seen_listing = stored.status;
                }

                // Applications move along their state machine edges only.
                for a in &applications {
                    if let Some(prev) = seen.insert(a.id, a.status) {
                        assert!(
                            prev == a.status || prev.can_become(a.status),
                            "{prev} -> {}",
                            a.status,
                        );
                    } else {
                        assert_eq!(a.status, application::Status::Pending);
                    }
                }

                // At most one active application per applicant.
                for applicant in APPLICANTS {
                    let active = applications
                        .iter()
                        .filter(|a| {
                            a.is_active() && a.applicant_id == user(applicant)
                        })
                        .count();
                    assert!(active <= 1, "{applicant} has {active}");
                }

                // Only finalization signs, and it leaves nothing accepted.
                let signed = applications
                    .iter()
                    .filter(|a| a.status == application::Status::Signed)
                    .count();
                if stored.status == listing::Status::Finalized {
                    assert!(applications
                        .iter()
                        .all(|a| a.status != application::Status::Accepted));
                    let filled = u32::try_from(signed).unwrap()
                        + stored.initiator_role.occupied_slots();
                    let total =
                        slot::capacity(stored.total_spots, stored.bedrooms);
                    assert!(filled >= total, "{filled}/{total}");
                } else {
                    assert_eq!(signed, 0);
                }
            }
        });
    }
}
