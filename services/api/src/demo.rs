use crate::infra::{InMemoryRoomFiles, OutboxNotifier};
use campaign_desk::error::AppError;
use campaign_desk::workflows::campaigns::{
    AdminId, CampaignService, CampaignStatus, CampaignType, ChatReaper, ChatRoom,
    ChatRoomId, ChatRoomStatus, ChatRoomStore, CreatorId, CreatorProfile, LedgerEntry,
    MemoryStore, NewCampaign, ReaperSettings, ShipmentDetails, SweepOutcome,
};
use chrono::{Duration, Utc};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Units of product available in the demo campaign
    #[arg(long, default_value_t = 2)]
    pub(crate) inventory: u32,
    /// Points awarded when the first upload is verified
    #[arg(long, default_value_t = 5)]
    pub(crate) points: i32,
    /// Skip the chat room reaper portion of the demo
    #[arg(long)]
    pub(crate) skip_reaper: bool,
}

type DemoService = CampaignService<MemoryStore, OutboxNotifier>;

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(OutboxNotifier::default());
    let service = CampaignService::new(store.clone(), notifier.clone());
    let admin = AdminId::from("admin-demo");

    println!("Campaign desk demo");

    let ana = CreatorId::from("ana");
    let bo = CreatorId::from("bo");
    for (id, name) in [(&ana, "Ana Reyes"), (&bo, "Bo Lindqvist")] {
        let creator = service
            .register_creator(id.clone(), demo_profile(name))
            .await?;
        println!(
            "Registered {} (score {}, tier {})",
            creator.id,
            creator.score,
            creator.tier()
        );
    }

    let campaign = service
        .create_campaign(
            &admin,
            NewCampaign {
                title: "Summer serum launch".to_string(),
                campaign_type: CampaignType::Gifted,
                inventory: args.inventory,
                application_deadline: Some(Utc::now() + Duration::days(14)),
            },
        )
        .await?;
    let campaign = service
        .set_campaign_status(&admin, &campaign.id, CampaignStatus::Active)
        .await?;
    println!(
        "\nCampaign {} '{}' is {} with {} units",
        campaign.id, campaign.title, campaign.status, campaign.inventory
    );

    let first = service.apply(&ana, &campaign.id).await?;
    let second = service.apply(&bo, &campaign.id).await?;
    println!(
        "Applications: {} (#{}) and {} (#{})",
        first.id, first.sequence_number, second.id, second.sequence_number
    );

    for application in [&first, &second] {
        match service.approve(&admin, &application.id).await {
            Ok(approved) => {
                service
                    .ship(
                        &admin,
                        &approved.id,
                        ShipmentDetails {
                            carrier: Some("DHL".to_string()),
                            tracking_number: Some(format!("TRK-{}", approved.sequence_number)),
                        },
                    )
                    .await?;
                service.deliver(&admin, &approved.id).await?;
                println!("- {} approved, shipped, and delivered", approved.id);
            }
            Err(err) => println!("- {} not approved: {}", application.id, err),
        }
    }

    let campaign = service.campaign(&campaign.id).await?;
    println!(
        "Inventory: {}/{} committed, campaign {}",
        campaign.approved_count, campaign.inventory, campaign.status
    );

    println!("\nContent review");
    match service
        .mark_uploaded(&admin, &first.id, Some(args.points))
        .await
    {
        Ok(application) => println!("- {} upload verified", application.id),
        Err(err) => println!("- {} upload not verified: {}", first.id, err),
    }
    match service.mark_missed(&admin, &second.id).await {
        Ok(application) => println!("- {} missed its deadline", application.id),
        Err(err) => println!("- {} not marked missed: {}", second.id, err),
    }

    render_creator(&service, &ana).await?;
    render_creator(&service, &bo).await?;

    let bo_record = service.creator(&bo).await?;
    if bo_record.restricted {
        let unlocked = service.unlock(&admin, &bo).await?;
        println!(
            "\nAdmin unlocked {} (penalty {}, restricted {})",
            unlocked.id, unlocked.penalty, unlocked.restricted
        );
    }

    let notifications = notifier.drain();
    println!("\nNotifications queued: {}", notifications.len());
    for notification in &notifications {
        println!("- {:?} -> {}", notification.kind, notification.recipient);
    }

    if !args.skip_reaper {
        run_reaper_demo(store).await?;
    }

    Ok(())
}

fn demo_profile(name: &str) -> CreatorProfile {
    let handle = name
        .split_whitespace()
        .next()
        .unwrap_or(name)
        .to_lowercase();
    CreatorProfile {
        display_name: name.to_string(),
        email: format!("{handle}@example.com"),
        instagram_handle: Some(format!("@{handle}")),
        shipping_address: Some("221 Canal Street, Amsterdam".to_string()),
        paypal_email: None,
    }
}

async fn render_creator(service: &DemoService, id: &CreatorId) -> Result<(), AppError> {
    let creator = service.creator(id).await?;
    println!(
        "\n{}: score {}, penalty {}, completed {}, tier {}{}",
        creator.id,
        creator.score,
        creator.penalty,
        creator.completed_campaigns,
        creator.tier(),
        if creator.restricted { " (restricted)" } else { "" }
    );
    if let Some(tier) = creator.pending_tier_upgrade {
        println!("  tier upgrade to celebrate: {tier}");
    }
    for entry in service.ledger_history(id).await? {
        let (kind, reason) = match &entry {
            LedgerEntry::Score(event) => ("score", event.reason.label()),
            LedgerEntry::Penalty(event) => ("penalty", event.reason.label()),
        };
        println!("  {kind:<7} {:>+4} {reason}", entry.delta());
    }
    Ok(())
}

async fn run_reaper_demo(store: Arc<MemoryStore>) -> Result<(), AppError> {
    let files = Arc::new(InMemoryRoomFiles::default());
    let now = Utc::now();
    let room = ChatRoom {
        id: ChatRoomId::from("room-demo"),
        creator_id: CreatorId::from("ana"),
        status: ChatRoomStatus::Active,
        expires_at: now - Duration::minutes(5),
        admin_unread_count: 1,
        ended_at: None,
        ended_by: None,
        created_at: now - Duration::hours(24),
    };
    let room = store.insert_chat_room(room).await?;
    if let Err(err) = files.attach(&room.id, "unboxing.mp4") {
        println!("- could not attach demo upload: {err}");
    }

    let reaper = ChatReaper::new(store, files.clone(), ReaperSettings::default());
    println!("\nChat reaper");
    for pass in 1..=2 {
        match reaper.sweep().await? {
            SweepOutcome::Completed(report) => println!(
                "- pass {pass}: ended {}, failed {}, raced {}",
                report.ended, report.failed, report.raced
            ),
            SweepOutcome::Skipped(reason) => println!("- pass {pass}: skipped ({reason:?})"),
        }
    }
    println!(
        "- attachments left for {}: {}",
        room.id,
        files.files_for(&room.id).len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_runs_with_default_inventory() {
        run_demo(DemoArgs {
            inventory: 2,
            points: 5,
            skip_reaper: false,
        })
        .await
        .expect("demo completes");
    }

    #[tokio::test]
    async fn demo_tolerates_a_single_unit() {
        run_demo(DemoArgs {
            inventory: 1,
            points: 5,
            skip_reaper: true,
        })
        .await
        .expect("demo completes");
    }
}
