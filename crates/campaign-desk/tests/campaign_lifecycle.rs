//! End-to-end campaign journeys driven through the public service facade.
//!
//! Creators with an existing track record are seeded straight into the store; everything
//! afterwards goes through `CampaignService` the way the HTTP layer would.

mod common {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use campaign_desk::workflows::campaigns::{
        AdminId, Campaign, CampaignId, CampaignService, CampaignStatus, CampaignStore,
        CampaignType, Creator, CreatorId, CreatorProfile, MemoryStore, Notification,
        NotificationError, NotificationKind, Notifier,
    };

    #[derive(Default)]
    pub(super) struct InboxNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl InboxNotifier {
        pub(super) fn kinds_for(&self, creator: &str) -> Vec<NotificationKind> {
            self.sent
                .lock()
                .expect("inbox mutex poisoned")
                .iter()
                .filter(|notification| notification.recipient.as_str() == creator)
                .map(|notification| notification.kind)
                .collect()
        }
    }

    #[async_trait]
    impl Notifier for InboxNotifier {
        async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
            self.sent
                .lock()
                .expect("inbox mutex poisoned")
                .push(notification);
            Ok(())
        }
    }

    pub(super) type Service = CampaignService<MemoryStore, InboxNotifier>;

    pub(super) fn service() -> (Service, Arc<MemoryStore>, Arc<InboxNotifier>) {
        let store = Arc::new(MemoryStore::new());
        let inbox = Arc::new(InboxNotifier::default());
        (
            CampaignService::new(store.clone(), inbox.clone()),
            store,
            inbox,
        )
    }

    pub(super) fn admin() -> AdminId {
        AdminId::from("ops-lead")
    }

    pub(super) fn profile(handle: &str) -> CreatorProfile {
        CreatorProfile {
            display_name: handle.to_uppercase(),
            email: format!("{handle}@studio.example"),
            instagram_handle: Some(format!("@{handle}")),
            shipping_address: Some("Rua Augusta 40, Lisboa".to_string()),
            paypal_email: Some(format!("{handle}@pay.example")),
        }
    }

    pub(super) async fn veteran(store: &MemoryStore, id: &str, completed: u32, score: u8) {
        let mut creator = Creator::new(CreatorId::from(id), profile(id), Utc::now());
        creator.completed_campaigns = completed;
        creator.score = score;
        store.insert_creator(creator).await.expect("creator seeded");
    }

    pub(super) async fn open_campaign(store: &MemoryStore, id: &str, inventory: u32) {
        store
            .insert_campaign(Campaign {
                id: CampaignId::from(id),
                title: format!("{id} collab"),
                campaign_type: CampaignType::GiftedPlusPaid,
                inventory,
                approved_count: 0,
                status: CampaignStatus::Active,
                application_deadline: Some(Utc::now() + Duration::days(3)),
                created_at: Utc::now(),
            })
            .await
            .expect("campaign seeded");
    }
}

use campaign_desk::workflows::campaigns::{
    ApplicationStatus, CampaignError, CampaignId, CampaignStatus, CreatorId, NotificationKind,
    ShipmentDetails, Tier,
};
use common::*;

#[tokio::test]
async fn standard_creator_reaches_vip_after_upload() {
    let (service, store, inbox) = service();
    veteran(&store, "lena", 3, 80).await;
    open_campaign(&store, "glow", 2).await;

    let creator = CreatorId::from("lena");
    let campaign = CampaignId::from("glow");
    let application = service.apply(&creator, &campaign).await.expect("applied");
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert!(application.first_time, "no completion in this store yet");

    service
        .approve(&admin(), &application.id)
        .await
        .expect("approved");
    service
        .ship(&admin(), &application.id, ShipmentDetails::default())
        .await
        .expect("shipped");
    service
        .deliver(&admin(), &application.id)
        .await
        .expect("delivered");
    service
        .mark_uploaded(&admin(), &application.id, Some(0))
        .await
        .expect("upload verified");

    let lena = service.creator(&creator).await.expect("creator");
    assert_eq!(lena.score, 85);
    assert_eq!(lena.tier(), Tier::Vip);
    assert_eq!(lena.pending_tier_upgrade, Some(Tier::Vip));
    assert_eq!(
        inbox.kinds_for("lena"),
        vec![
            NotificationKind::ApplicationApproved,
            NotificationKind::ProductShipped,
            NotificationKind::UploadVerified,
            NotificationKind::TierUpgrade,
        ]
    );

    open_campaign(&store, "encore", 1).await;
    let auto = service
        .apply(&creator, &CampaignId::from("encore"))
        .await
        .expect("applied");
    assert_eq!(auto.status, ApplicationStatus::Approved);
    let encore = service
        .campaign(&CampaignId::from("encore"))
        .await
        .expect("campaign");
    assert_eq!(encore.approved_count, 1);
    assert_eq!(encore.status, CampaignStatus::Full);
}

#[tokio::test]
async fn ghosting_restricts_until_admin_unlocks() {
    let (service, store, inbox) = service();
    service
        .register_creator(CreatorId::from("milo"), profile("milo"))
        .await
        .expect("registered");
    open_campaign(&store, "first-box", 3).await;
    open_campaign(&store, "second-box", 3).await;

    let creator = CreatorId::from("milo");
    let application = service
        .apply(&creator, &CampaignId::from("first-box"))
        .await
        .expect("applied");
    service
        .approve(&admin(), &application.id)
        .await
        .expect("approved");
    service
        .ship(&admin(), &application.id, ShipmentDetails::default())
        .await
        .expect("shipped");
    service
        .deliver(&admin(), &application.id)
        .await
        .expect("delivered");
    service
        .mark_missed(&admin(), &application.id)
        .await
        .expect("missed");

    assert!(inbox.kinds_for("milo").contains(&NotificationKind::DeadlineMissed));
    match service
        .apply(&creator, &CampaignId::from("second-box"))
        .await
    {
        Err(CampaignError::AccountRestricted) => {}
        other => panic!("expected AccountRestricted, got {other:?}"),
    }

    let unlocked = service.unlock(&admin(), &creator).await.expect("unlocked");
    assert!(!unlocked.restricted);
    assert_eq!(unlocked.penalty, 0);

    let retry = service
        .apply(&creator, &CampaignId::from("second-box"))
        .await
        .expect("applies again after unlock");
    assert_eq!(retry.status, ApplicationStatus::Pending);

    let reasons: Vec<&str> = service
        .ledger_history(&creator)
        .await
        .expect("ledger")
        .iter()
        .map(|entry| entry.reason_label())
        .collect();
    assert_eq!(reasons, vec!["signup_baseline", "first_ghosting", "rollback"]);
}
