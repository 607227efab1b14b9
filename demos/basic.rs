//! Basic example demonstrating the SonarCloud quality profiles client.
//!
//! Run with:
//! ```
//! SONAR_TOKEN=your-token SONAR_ORGANIZATION=your-org cargo run --example basic
//! ```

use sonarapi::{
    get_changelog_page, get_history_of_changes_on_quality_profile, search_quality_profiles,
    show_quality_profile, ChangelogQuery, SearchQuery, SonarClient, SonarError,
};

#[tokio::main]
async fn main() -> sonarapi::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    let organization = std::env::var("SONAR_ORGANIZATION")
        .map_err(|_| SonarError::ConfigMissing("SONAR_ORGANIZATION not set".to_string()))?;

    // Create client from environment variables
    println!("Creating SonarCloud client...");
    let client = SonarClient::from_env()?;
    println!("Connected to: {}", client.base_url());

    // Default profile of every language
    println!("\n--- Default Profiles ---");
    let query = SearchQuery {
        defaults: true,
        ..SearchQuery::for_organization(&organization)
    };
    let defaults = search_quality_profiles(&client, &query).await?;
    println!("Found {} default profiles", defaults.len());

    for profile in &defaults {
        println!(
            "  - {} [{}] {} rules",
            profile.name,
            profile.language,
            profile.active_rule_count.unwrap_or(0)
        );
    }

    let Some(first) = defaults.first() else {
        println!("\nDone!");
        return Ok(());
    };
    let selector = first.selector(&organization);

    // Inheritance of the first default profile
    println!("\n--- Inheritance of {} ---", first.name);
    let inheritance = show_quality_profile(&client, &selector).await?;
    println!("  Ancestors: {}", inheritance.ancestors.len());
    println!("  Children: {}", inheritance.children.len());
    for child in &inheritance.children {
        println!("    - {} ({} rules)", child.name, child.active_rule_count);
    }

    // One page of the changelog
    let changelog = ChangelogQuery::new(selector);
    println!("\n--- Changelog (first page) ---");
    let page = get_changelog_page(&client, &changelog, 1, 10).await?;
    println!("Showing {} of {} events", page.len(), page.total);
    for event in &page {
        println!(
            "  {} {:?} {}",
            event
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            event.action,
            event.rule_key.as_deref().unwrap_or("-")
        );
    }

    // Whole changelog through the paged fetcher
    println!("\n--- Changelog (all pages) ---");
    let mut events = get_history_of_changes_on_quality_profile(&client, &changelog)?;
    let mut count = 0;
    while let Some(event) = events.next().await? {
        if event.author().is_some() {
            count += 1;
        }
    }
    println!(
        "{} events with a known author over {} requests",
        count,
        events.pages_fetched()
    );

    println!("\nDone!");
    Ok(())
}
