//! Prints every stored event using the server's configuration.

use event_vote::{config::AppConfig, logging::init_tracing, store};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_figment(&rocket::Config::figment())?;
    let events = store::read_events(&config).await?;

    if events.is_empty() {
        println!("No events found!");
    }

    for event in &events {
        println!("Event ID: {}", event.id);
        println!("Title: {}", event.title);
        println!("Description: {}", event.description);
        println!("Date: {}", event.date);
        println!("Votes ({}): {:?}", event.total_votes(), event.votes);
        println!("{}", "-".repeat(40));
    }

    Ok(())
}
