use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use report_core::{
    presenter::{present_table, TableControls, Visibility},
    store::ReportOrder,
    ReportStore, StaticCatalog,
};
use shared::{
    domain::{AccountStatus, InspectorId, Role, Sector},
    protocol::{SortKey, TableView},
};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/signalisation.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateInspector {
        name: String,
        #[arg(long)]
        admin: bool,
        /// Register the account without the signage capability.
        #[arg(long)]
        no_signalisation: bool,
    },
    SetAccountStatus {
        inspector_id: i64,
        #[arg(value_enum)]
        status: StatusArg,
    },
    SetSignalisationAccess {
        inspector_id: i64,
        #[arg(action = clap::ArgAction::Set)]
        allowed: bool,
    },
    ListAccounts,
    ListReports {
        #[arg(long)]
        show_resolved: bool,
        #[arg(long)]
        show_archived: bool,
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        by_sector: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Active,
    Inactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateInspector {
            name,
            admin,
            no_signalisation,
        } => {
            let role = if admin { Role::Admin } else { Role::Inspector };
            let inspector_id = storage
                .create_inspector(&name, role, !no_signalisation)
                .await?;
            println!("created inspector_id={inspector_id}");
        }
        Command::SetAccountStatus {
            inspector_id,
            status,
        } => {
            let status = match status {
                StatusArg::Active => AccountStatus::Active,
                StatusArg::Inactive => AccountStatus::Inactive,
            };
            let found = storage
                .set_account_status(InspectorId(inspector_id), status)
                .await?;
            anyhow::ensure!(found, "inspector {inspector_id} not found");
            println!("inspector {inspector_id} is now {status:?}");
        }
        Command::SetSignalisationAccess {
            inspector_id,
            allowed,
        } => {
            let found = storage
                .set_signalisation_access(InspectorId(inspector_id), allowed)
                .await?;
            anyhow::ensure!(found, "inspector {inspector_id} not found");
            println!("inspector {inspector_id} allow_signalisation={allowed}");
        }
        Command::ListAccounts => {
            for account in storage.list_accounts().await? {
                println!(
                    "{}\t{}\t{:?}\t{:?}\tsignalisation={}",
                    account.inspector_id,
                    account.name,
                    account.role,
                    account.status,
                    account.allow_signalisation
                );
            }
        }
        Command::ListReports {
            show_resolved,
            show_archived,
            sector,
            by_sector,
        } => {
            let visibility = Visibility {
                show_resolved,
                show_archived,
            };
            let controls = TableControls {
                sector: sector.as_deref().map(str::parse::<Sector>).transpose()?,
                sort: if by_sector { SortKey::Sector } else { SortKey::Date },
            };
            let reports = storage
                .query(visibility.query(), ReportOrder::CreatedAtDesc, None)
                .await?;

            match present_table(&reports, controls, &StaticCatalog) {
                TableView::Rows { rows } => {
                    for row in rows {
                        let status = row
                            .status
                            .map(|badge| badge.label)
                            .unwrap_or_else(|| "-".to_string());
                        let states: Vec<&str> = row.states.iter().map(|s| s.label()).collect();
                        println!(
                            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                            row.report_id,
                            row.created,
                            row.sector,
                            row.trail,
                            status,
                            row.inspector_name,
                            states.join(",")
                        );
                    }
                }
                TableView::Empty { placeholder } => println!("{placeholder}"),
                TableView::Loading | TableView::Error { .. } => {}
            }
        }
    }

    Ok(())
}
