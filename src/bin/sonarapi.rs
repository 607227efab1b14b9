//! SonarCloud quality profiles CLI binary.
//!
//! A command-line interface for managing quality profiles.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use sonarapi::cli::{Cli, Command, ProfileArgs};
use sonarapi::output::PrettyPrint;
use sonarapi::{
    associate_project_with_quality_profile, backup_quality_profile,
    change_parent_of_quality_profile, create_quality_profile, delete_quality_profile,
    export_quality_profile, get_history_of_changes_on_quality_profile,
    list_quality_profile_exporters, remove_project_associate_with_quality_profile,
    restore_quality_profile, search_quality_profiles, set_default_quality_profile,
    show_quality_profile, ChangelogQuery, ExportQuery, Exporter, ProfileBackup, ProfileSelector,
    QualityProfile, SearchQuery, SonarClient, SonarError,
};
use tabled::{Table, Tabled};
use tracing::Level;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let client = match SonarClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set SONAR_TOKEN environment variable");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(client: &SonarClient, cli: Cli) -> sonarapi::Result<()> {
    let json = cli.json;
    let org = cli.organization;

    match cli.command {
        Command::Search {
            language,
            project,
            profile,
            defaults,
        } => {
            let query = SearchQuery {
                organization: require_org(&org)?.to_string(),
                defaults,
                language,
                project_key: project,
                quality_profile: profile,
            };
            let profiles = search_quality_profiles(client, &query).await?;
            output_list(&profiles, json, |p| ProfileRow::from(p))?;
        }
        Command::Show { profile } => {
            let inheritance = show_quality_profile(client, &selector(&profile, &org)?).await?;
            output_single(&inheritance, json)?;
        }
        Command::Changelog {
            profile,
            since,
            to,
            limit,
            page_size,
        } => {
            let query = ChangelogQuery {
                profile: selector(&profile, &org)?,
                since,
                to,
            };
            let mut events = get_history_of_changes_on_quality_profile(client, &query)?;
            if let Some(ps) = page_size {
                events = events.with_page_size(ps);
            }

            let limit = limit.unwrap_or(usize::MAX);
            let mut collected = Vec::new();
            while collected.len() < limit {
                match events.next().await? {
                    Some(event) => collected.push(event),
                    None => break,
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&collected)?);
            } else {
                for event in &collected {
                    println!("{}", event.pretty_print());
                }
            }
        }
        Command::Backup { profile, output } => {
            let xml = backup_quality_profile(client, &selector(&profile, &org)?).await?;
            write_document(&xml, output.as_deref()).await?;
        }
        Command::Restore { file } => {
            let backup = ProfileBackup::from_path(&file).await?;
            let result = restore_quality_profile(client, backup, require_org(&org)?).await?;
            output_single(&result, json)?;
        }
        Command::Export {
            exporter,
            language,
            profile,
            output,
        } => {
            let query = ExportQuery {
                organization: require_org(&org)?.to_string(),
                exporter_key: exporter,
                language,
                quality_profile: profile,
            };
            let document = export_quality_profile(client, &query).await?;
            write_document(&document, output.as_deref()).await?;
        }
        Command::Exporters => {
            let exporters = list_quality_profile_exporters(client).await?;
            output_list(&exporters, json, |e| ExporterRow::from(e))?;
        }
        Command::Create { language, name } => {
            let created = create_quality_profile(client, &language, &name, require_org(&org)?).await?;
            for warning in &created.warnings {
                eprintln!("Warning: {warning}");
            }
            output_single(&created.profile, json)?;
        }
        Command::Delete { profile } => {
            delete_quality_profile(client, &selector(&profile, &org)?).await?;
            eprintln!("Deleted {}", profile.profile);
        }
        Command::SetDefault { profile } => {
            set_default_quality_profile(client, &selector(&profile, &org)?).await?;
            eprintln!("{} is now the default {} profile", profile.profile, profile.language);
        }
        Command::AddProject { project, profile } => {
            associate_project_with_quality_profile(client, &project, &selector(&profile, &org)?)
                .await?;
            eprintln!("Associated {project} with {}", profile.profile);
        }
        Command::RemoveProject { project, profile } => {
            remove_project_associate_with_quality_profile(
                client,
                &project,
                &selector(&profile, &org)?,
            )
            .await?;
            eprintln!("Removed {project} from {}", profile.profile);
        }
        Command::ChangeParent { profile, parent } => {
            change_parent_of_quality_profile(client, parent.as_deref(), &selector(&profile, &org)?)
                .await?;
            match parent {
                Some(p) => eprintln!("{} now inherits from {p}", profile.profile),
                None => eprintln!("{} no longer has a parent", profile.profile),
            }
        }
    }
    Ok(())
}

fn require_org(org: &Option<String>) -> sonarapi::Result<&str> {
    org.as_deref().ok_or_else(|| {
        SonarError::ConfigMissing(
            "--organization or SONAR_ORGANIZATION is required".to_string(),
        )
    })
}

fn selector(args: &ProfileArgs, org: &Option<String>) -> sonarapi::Result<ProfileSelector> {
    Ok(ProfileSelector::new(
        &args.language,
        &args.profile,
        require_org(org)?,
    ))
}

async fn write_document(document: &str, output: Option<&Path>) -> sonarapi::Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, document).await?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

fn output_single<T: Serialize + PrettyPrint>(item: &T, json: bool) -> sonarapi::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(item)?);
    } else {
        println!("{}", item.pretty_print());
    }
    Ok(())
}

fn output_list<T, R, F>(items: &[T], json: bool, to_row: F) -> sonarapi::Result<()>
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        println!("{}", Table::new(rows));
        println!("\n{} total", items.len());
    }
    Ok(())
}

// Table row types for non-JSON output

#[derive(Tabled)]
struct ProfileRow {
    name: String,
    language: String,
    key: String,
    rules: String,
    default: String,
}

impl From<&QualityProfile> for ProfileRow {
    fn from(p: &QualityProfile) -> Self {
        Self {
            name: p.name.clone(),
            language: p.language.clone(),
            key: p.key.clone(),
            rules: p
                .active_rule_count
                .map(|c| c.to_string())
                .unwrap_or_default(),
            default: if p.is_default { "yes" } else { "" }.to_string(),
        }
    }
}

#[derive(Tabled)]
struct ExporterRow {
    key: String,
    name: String,
    languages: String,
}

impl From<&Exporter> for ExporterRow {
    fn from(e: &Exporter) -> Self {
        Self {
            key: e.key.clone(),
            name: e.name.clone(),
            languages: e.languages.join(", "),
        }
    }
}
