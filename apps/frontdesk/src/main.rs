use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use client_core::{
    AuthFormController, DashboardLoader, Field, HttpApiClient, MemorySessionStore, SessionStore,
    SubmitOutcome,
};
use shared::domain::Role;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the hotel service, e.g. http://localhost:8080/api
    #[arg(long)]
    server_url: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let session = Arc::new(MemorySessionStore::default());
    let api = Arc::new(HttpApiClient::new(
        args.server_url,
        Arc::clone(&session) as Arc<dyn SessionStore>,
    )?);

    let mut form = AuthFormController::default();
    form.set_field(Field::Username, args.username);
    form.set_field(Field::Password, args.password);

    let viewer = match form.submit(api.as_ref()).await {
        SubmitOutcome::SignedIn(auth) => auth.current_user(),
        SubmitOutcome::Invalid => {
            for (field, message) in form.field_errors() {
                eprintln!("{field:?}: {message}");
            }
            bail!("credentials rejected before submission");
        }
        SubmitOutcome::Failed => {
            bail!(
                "sign-in failed: {}",
                form.submit_error().unwrap_or("unknown error")
            );
        }
        outcome => bail!("unexpected submission outcome: {outcome:?}"),
    };

    println!(
        "Signed in as {} ({})",
        viewer.username,
        if viewer.role == Role::Admin {
            "admin"
        } else {
            "guest"
        }
    );

    info!("loading dashboard");
    let loader = DashboardLoader::new(api);
    let stats = loader.load(&viewer).await?;

    println!(
        "Rooms: {} total, {} available",
        stats.total_rooms, stats.available_rooms
    );
    println!("Active bookings: {}", stats.active_bookings);
    if stats.privileged {
        println!("Total bookings: {}", stats.total_bookings);
        println!("Total revenue: ${:.2}", stats.total_revenue);
        println!("Occupancy rate: {:.1}%", stats.occupancy_rate);
    }

    println!("Recent activity:");
    for booking in &stats.recent_activity {
        println!(
            "  #{} room {} {:?} {} -> {}{}",
            booking.id.0,
            booking.room_label(),
            booking.status,
            booking.check_in_date.date_naive(),
            booking.check_out_date.date_naive(),
            booking
                .guest_name()
                .map(|name| format!(" ({name})"))
                .unwrap_or_default(),
        );
    }
    for anomaly in &stats.anomalies {
        eprintln!("warning: {anomaly}");
    }

    Ok(())
}
