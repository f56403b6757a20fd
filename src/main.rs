mod cli;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use pt_core::config::Config;
use pt_image::ImageNormalizer;
use pt_server::context::AppContext;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "portrait=debug,pt_server=debug,pt_db=debug,pt_image=debug,tower_http=debug".to_string()
        } else {
            "portrait=info,pt_server=info,pt_db=info,pt_image=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::CreateUser {
            username,
            password,
            admin,
        } => create_user(cli.config.as_deref(), &username, &password, admin),
        Commands::Normalize {
            input,
            output,
            size,
        } => normalize(cli.config.as_deref(), &input, &output, size),
        Commands::ListProfiles => list_profiles(cli.config.as_deref()),
        Commands::HashPassword { password } => hash_password(&password),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("portrait {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(
        "Starting portrait on {}:{} (media root {})",
        config.server.host,
        config.server.port,
        config.media.root.display()
    );

    pt_server::start(config).await.context("server failed")
}

fn create_user(
    config_path: Option<&Path>,
    username: &str,
    password: &str,
    admin: bool,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let db = pt_db::pool::init_pool(&config.server.db_path)
        .with_context(|| format!("opening database {}", config.server.db_path.display()))?;
    let ctx = AppContext::new(db, config);

    let role = if admin { "admin" } else { "user" };
    let (user, profile) =
        pt_server::profiles::create_user_with_profile(&ctx, username, password, role)
            .context("creating user")?;

    println!("Created {role} '{}' ({})", user.username, user.id);
    println!("  Profile: {} (picture {})", profile.id, profile.picture);
    Ok(())
}

fn normalize(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    size: Option<u32>,
) -> Result<()> {
    let size = match size {
        Some(size) => size,
        None => Config::load_or_default(config_path).media.picture_size,
    };

    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let stored = ImageNormalizer::new(size)
        .normalize(&data)
        .with_context(|| format!("normalizing {}", input.display()))?;
    std::fs::write(output, &stored.bytes)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Wrote {}x{} {:?} to {}",
        stored.width,
        stored.height,
        stored.format,
        output.display()
    );
    Ok(())
}

fn list_profiles(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let db = pt_db::pool::init_pool(&config.server.db_path)
        .with_context(|| format!("opening database {}", config.server.db_path.display()))?;
    let conn = pt_db::pool::get_conn(&db)?;

    let usernames: HashMap<_, _> = pt_db::queries::users::list_users(&conn)?
        .into_iter()
        .map(|user| (user.id, user.username))
        .collect();
    let profiles = pt_db::queries::profiles::list_profiles(&conn)?;

    if profiles.is_empty() {
        println!("No profiles");
        return Ok(());
    }

    let prefix = config.media.mount_path();
    for profile in profiles {
        let username = usernames.get(&profile.user_id).map_or("?", String::as_str);
        println!(
            "{username}\t{}\t{}\t{}",
            profile.picture.url(&prefix),
            profile.location.as_deref().unwrap_or("-"),
            profile.created_at
        );
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<()> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).context("hashing password")?;
    println!("{hash}");
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration is valid");
    } else {
        println!("Configuration is usable with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!(
        "  Media: {} served at {}",
        config.media.root.display(),
        config.media.mount_path()
    );
    println!("  Picture size: {}px", config.media.picture_size);
    Ok(())
}
