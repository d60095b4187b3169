//! Listing and application lifecycle scenarios.

mod support;

use service::{
    command::{
        cancel_listing, decide_application, finalize_listing,
        submit_application, CancelListing, DecideApplication,
        FinalizeListing, Retry, SubmitApplication, Transient as _,
    },
    domain::{application, lease, listing, slot},
    query, Command as _, Query as _,
};

use self::support::{
    accepted, create_listing, service, stored_applications, stored_listing,
    submit, user,
};

#[tokio::test]
async fn landlord_listing_finalizes_once_filled() {
    let (svc, _) = service();
    let listing = svc
        .execute(create_listing("lara", listing::InitiatorRole::Landlord, 2))
        .await
        .unwrap();
    let alice = accepted(&svc, listing.id, "lara", "alice").await;
    let bob = accepted(&svc, listing.id, "lara", "bob").await;

    let occupancy = svc
        .execute(query::listing::Occupancy {
            listing_id: listing.id,
        })
        .await
        .unwrap()
        .unwrap()
        .occupancy;
    assert_eq!(occupancy, slot::Occupancy { filled: 2, total: 2 });

    let finalized = svc
        .execute(FinalizeListing {
            listing_id: listing.id,
            requester_id: user("lara"),
        })
        .await
        .unwrap();

    assert_eq!(finalized.listing.status, listing::Status::Finalized);
    assert_eq!(finalized.signed_applications, 2);
    for a in stored_applications(&svc, listing.id).await {
        assert!([alice.id, bob.id].contains(&a.id));
        assert_eq!(a.status, application::Status::Signed);
    }
}

#[tokio::test]
async fn landlord_listing_stays_active_when_underfilled() {
    let (svc, _) = service();
    let listing = svc
        .execute(create_listing("lara", listing::InitiatorRole::Landlord, 2))
        .await
        .unwrap();
    drop(accepted(&svc, listing.id, "lara", "alice").await);

    let err = svc
        .execute(FinalizeListing {
            listing_id: listing.id,
            requester_id: user("lara"),
        })
        .await
        .unwrap_err();

    assert!(
        matches!(
            err.as_ref(),
            finalize_listing::ExecutionError::InsufficientSlotsFilled {
                filled: 1,
                total: 2,
            },
        ),
        "{err}",
    );
    let stored = stored_listing(&svc, listing.id).await;
    assert_eq!(stored.status, listing::Status::Active);
}

#[tokio::test]
async fn initiator_cannot_apply_to_own_listing() {
    let (svc, _) = service();
    let listing = svc
        .execute(create_listing("ann", listing::InitiatorRole::Tenant, 2))
        .await
        .unwrap();

    let err = svc.execute(submit(listing.id, "ann")).await.unwrap_err();

    assert!(
        matches!(
            err.as_ref(),
            submit_application::ExecutionError::SelfApplicationForbidden(_),
        ),
        "{err}",
    );
    assert!(stored_applications(&svc, listing.id).await.is_empty());
}

#[tokio::test]
async fn second_pending_application_is_duplicate() {
    let (svc, _) = service();
    let listing = svc
        .execute(create_listing("ann", listing::InitiatorRole::Tenant, 2))
        .await
        .unwrap();
    drop(svc.execute(submit(listing.id, "alice")).await.unwrap());

    let err = svc.execute(submit(listing.id, "alice")).await.unwrap_err();

    assert!(
        matches!(
            err.as_ref(),
            submit_application::ExecutionError::DuplicateApplication(_),
        ),
        "{err}",
    );
    assert_eq!(stored_applications(&svc, listing.id).await.len(), 1);
}

#[tokio::test]
async fn negotiable_lease_needs_proposal() {
    let (svc, _) = service();
    let mut cmd = create_listing("ann", listing::InitiatorRole::Tenant, 2);
    cmd.lease_duration = lease::Duration::Negotiable;
    let listing = svc.execute(cmd).await.unwrap();

    let err = svc.execute(submit(listing.id, "alice")).await.unwrap_err();
    assert!(
        matches!(
            err.as_ref(),
            submit_application::ExecutionError::InvalidLeaseDuration,
        ),
        "{err}",
    );

    let application = svc
        .execute(SubmitApplication {
            lease_duration: Some(lease::Duration::SixToTwelveMonths.into()),
            ..submit(listing.id, "alice")
        })
        .await
        .unwrap();
    assert_eq!(application.status, application::Status::Pending);
    assert_eq!(
        application.lease_duration,
        Some(lease::Duration::SixToTwelveMonths),
    );
}

#[tokio::test]
async fn tenant_initiator_occupies_a_slot() {
    let (svc, _) = service();
    let listing = svc
        .execute(create_listing("ann", listing::InitiatorRole::Tenant, 3))
        .await
        .unwrap();
    drop(accepted(&svc, listing.id, "ann", "alice").await);

    let occupancy = svc
        .execute(query::listing::Occupancy {
            listing_id: listing.id,
        })
        .await
        .unwrap()
        .unwrap()
        .occupancy;
    assert_eq!(occupancy, slot::Occupancy { filled: 2, total: 3 });

    let err = svc
        .execute(FinalizeListing {
            listing_id: listing.id,
            requester_id: user("ann"),
        })
        .await
        .unwrap_err();
    assert!(
        matches!(
            err.as_ref(),
            finalize_listing::ExecutionError::InsufficientSlotsFilled {
                filled: 2,
                total: 3,
            },
        ),
        "{err}",
    );
}

#[tokio::test]
async fn finalize_and_cancel_are_not_repeatable() {
    let (svc, _) = service();
    let finalized = svc
        .execute(create_listing("ann", listing::InitiatorRole::Tenant, 1))
        .await
        .unwrap();
    let cancelled = svc
        .execute(create_listing("ann", listing::InitiatorRole::Tenant, 2))
        .await
        .unwrap();
    let finalize = FinalizeListing {
        listing_id: finalized.id,
        requester_id: user("ann"),
    };
    let cancel = CancelListing {
        listing_id: cancelled.id,
        requester_id: user("ann"),
    };

    drop(svc.execute(finalize.clone()).await.unwrap());
    drop(svc.execute(cancel.clone()).await.unwrap());
    let finalize_err = svc.execute(finalize).await.unwrap_err();
    let cancel_err = svc.execute(cancel).await.unwrap_err();

    assert!(
        matches!(
            finalize_err.as_ref(),
            finalize_listing::ExecutionError::InvalidState(_),
        ),
        "{finalize_err}",
    );
    assert!(
        matches!(
            cancel_err.as_ref(),
            cancel_listing::ExecutionError::InvalidState(_),
        ),
        "{cancel_err}",
    );
}

#[tokio::test]
async fn failed_finalize_leaves_no_trace() {
    let (svc, db) = service();
    let listing = svc
        .execute(create_listing("lara", listing::InitiatorRole::Landlord, 2))
        .await
        .unwrap();
    drop(accepted(&svc, listing.id, "lara", "alice").await);
    drop(accepted(&svc, listing.id, "lara", "bob").await);

    // Fails the update of the last accepted application.
    db.fail_after(6);
    let err = svc
        .execute(FinalizeListing {
            listing_id: listing.id,
            requester_id: user("lara"),
        })
        .await
        .unwrap_err();
    assert!(err.as_ref().is_transient());

    let stored = stored_listing(&svc, listing.id).await;
    assert_eq!(stored.status, listing::Status::Active);
    assert_eq!(stored.version, listing.version);
    for a in stored_applications(&svc, listing.id).await {
        assert_eq!(a.status, application::Status::Accepted);
    }
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let (svc, db) = service();
    let listing = svc
        .execute(create_listing("lara", listing::InitiatorRole::Landlord, 1))
        .await
        .unwrap();
    drop(accepted(&svc, listing.id, "lara", "alice").await);

    db.fail_after(3);
    let finalized = svc
        .execute(Retry(FinalizeListing {
            listing_id: listing.id,
            requester_id: user("lara"),
        }))
        .await
        .unwrap();

    assert_eq!(finalized.signed_applications, 1);
    let stored = stored_listing(&svc, listing.id).await;
    assert_eq!(stored.status, listing::Status::Finalized);
}

#[tokio::test]
async fn persistent_failure_gives_up() {
    let (svc, db) = service();
    let listing = svc
        .execute(create_listing("lara", listing::InitiatorRole::Landlord, 1))
        .await
        .unwrap();

    db.fail_next(2);
    let err = svc
        .execute(Retry(CancelListing {
            listing_id: listing.id,
            requester_id: user("lara"),
        }))
        .await
        .unwrap_err();

    assert!(
        matches!(err.as_ref(), cancel_listing::ExecutionError::Db(_)),
        "{err}",
    );
    assert!(err.as_ref().is_transient());
    let stored = stored_listing(&svc, listing.id).await;
    assert_eq!(stored.status, listing::Status::Active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_yield_single_application() {
    let (svc, _) = service();
    let listing = svc
        .execute(create_listing("ann", listing::InitiatorRole::Tenant, 3))
        .await
        .unwrap();

    let results = futures::future::join_all((0..8).map(|_| {
        let svc = svc.clone();
        tokio::spawn(async move {
            svc.execute(submit(listing.id, "alice")).await.map(drop)
        })
    }))
    .await;

    let succeeded = results
        .into_iter()
        .map(Result::unwrap)
        .filter(Result::is_ok)
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(stored_applications(&svc, listing.id).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn decision_racing_finalize_is_never_lost() {
    let (svc, _) = service();
    let listing = svc
        .execute(create_listing("ann", listing::InitiatorRole::Tenant, 2))
        .await
        .unwrap();
    drop(accepted(&svc, listing.id, "ann", "alice").await);
    let bob = svc.execute(submit(listing.id, "bob")).await.unwrap();

    let decide = tokio::spawn({
        let svc = svc.clone();
        async move {
            svc.execute(DecideApplication {
                application_id: bob.id,
                decider_id: user("ann"),
                decision: application::Decision::Accept,
            })
            .await
        }
    });
    let finalize = tokio::spawn({
        let svc = svc.clone();
        async move {
            svc.execute(FinalizeListing {
                listing_id: listing.id,
                requester_id: user("ann"),
            })
            .await
        }
    });
    let decided = decide.await.unwrap();
    let finalized = finalize.await.unwrap().unwrap();

    let bob = stored_applications(&svc, listing.id)
        .await
        .into_iter()
        .find(|a| a.id == bob.id)
        .unwrap();
    match decided {
        // Decided before finalization, so signed by it.
        Ok(_) => {
            assert_eq!(finalized.signed_applications, 2);
            assert_eq!(bob.status, application::Status::Signed);
        }
        Err(e) => {
            assert!(
                matches!(
                    e.as_ref(),
                    decide_application::ExecutionError::ListingNotActive(_),
                ),
                "{e}",
            );
            assert_eq!(finalized.signed_applications, 1);
            assert_eq!(bob.status, application::Status::Pending);
        }
    }
}
