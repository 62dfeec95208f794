use std::error::Error;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Engine, SettlementStatus};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "splitledger")]
#[command(about = "Operator utilities for the shared-expense ledger")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    /// Overrides the `[database]` settings.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply or inspect schema migrations.
    Migrate {
        #[arg(value_enum, default_value_t = MigrateDirection::Up)]
        direction: MigrateDirection,
    },
    User(User),
    Member(Member),
    /// Print every member's net balance in a group.
    Balances(GroupArgs),
    /// Print the transfers that would settle a group.
    Suggest(GroupArgs),
    /// List a group's settlements.
    Settlements(SettlementsArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MigrateDirection {
    Up,
    Down,
    Fresh,
    Status,
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    name: String,
    /// Payee handle used to build payment links (e.g. a UPI VPA).
    #[arg(long)]
    payment_handle: Option<String>,
}

#[derive(Args, Debug)]
struct Member {
    #[command(subcommand)]
    command: MemberCommand,
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Add(MemberAddArgs),
}

#[derive(Args, Debug)]
struct MemberAddArgs {
    #[arg(long)]
    group: String,
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct GroupArgs {
    #[arg(long)]
    group: String,
}

#[derive(Args, Debug)]
struct SettlementsArgs {
    #[arg(long)]
    group: String,
    /// Only settlements in this status.
    #[arg(long, value_parser = parse_status)]
    status: Option<SettlementStatus>,
}

fn parse_status(raw: &str) -> Result<SettlementStatus, String> {
    SettlementStatus::try_from(raw).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitledger={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    let db: DatabaseConnection = Database::connect(&url).await?;

    if let Command::Migrate { direction } = cli.command {
        match direction {
            MigrateDirection::Up => Migrator::up(&db, None).await?,
            MigrateDirection::Down => Migrator::down(&db, None).await?,
            MigrateDirection::Fresh => Migrator::fresh(&db).await?,
            MigrateDirection::Status => Migrator::status(&db).await?,
        }
        return Ok(());
    }

    Migrator::up(&db, None).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Migrate { .. } => {}
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let id = engine
                .register_user(&args.name, args.payment_handle.as_deref())
                .await?;
            println!("{id}");
        }
        Command::Member(Member {
            command: MemberCommand::Add(args),
        }) => {
            engine.add_group_member(&args.group, &args.user).await?;
            tracing::info!("user {} added to group {}", args.user, args.group);
        }
        Command::Balances(args) => {
            for balance in engine.group_balances(&args.group).await? {
                println!(
                    "{:<24} {:>36} {:>12}",
                    balance.name, balance.member_id, balance.net_balance
                );
            }
        }
        Command::Suggest(args) => {
            let transfers = engine.optimal_settlements(&args.group).await?;
            if transfers.is_empty() {
                println!("group {} is settled", args.group);
            }
            for transfer in transfers {
                println!(
                    "{} -> {}: {}",
                    transfer.from_name, transfer.to_name, transfer.amount
                );
            }
        }
        Command::Settlements(args) => {
            for settlement in engine.settlements(&args.group, args.status).await? {
                println!(
                    "{} {} -> {} {}/{} {}",
                    settlement.id,
                    settlement.payer_id,
                    settlement.payee_id,
                    settlement.settled_amount,
                    settlement.amount,
                    settlement.status.as_str()
                );
            }
        }
    }

    Ok(())
}
