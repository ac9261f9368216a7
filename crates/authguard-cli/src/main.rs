//! authguard - log in to a platform API and make guarded requests from the terminal.
//!
//! Every API call goes through the session guard, so an expired session is
//! cleared automatically and an anonymous 401 asks for credentials once.

mod notify;
mod prompt;

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use authguard_core::{
    ApiRequest, Config, FileStore, HttpTransport, KeyValueStore, KeyringStore, MemoryStore, Method,
    SessionGuard, StorageKind, Transport,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notify::ConsoleNotifier;
use prompt::TerminalPrompt;

/// Keychain service name for the keyring store
const KEYRING_SERVICE: &str = "authguard";

const USAGE: &str = "Usage: authguard <command>

Commands:
  login [USERNAME]                 Log in (interactive prompt without USERNAME)
  logout                           End the current session
  whoami                           Show the logged-in user
  request METHOD PATH [JSON-BODY]  Send a guarded API request
  reset-password TOKEN             Set a new password with a reset token
  init-config                      Write the effective configuration file";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    Ok(match config.storage {
        StorageKind::Keyring => Arc::new(KeyringStore::new(KEYRING_SERVICE)),
        StorageKind::File => Arc::new(FileStore::new(&config.cache_dir()?)),
        StorageKind::Memory => Arc::new(MemoryStore::new()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load().context("Failed to load config")?;
    let guard_config = config.guard_config();
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.api_root.clone())?);
    let prompt = Arc::new(TerminalPrompt::new(transport.clone(), guard_config.clone()));
    let guard = SessionGuard::new(
        transport,
        open_store(&config)?,
        Arc::new(ConsoleNotifier),
        prompt,
        guard_config,
    );
    info!(api_root = %config.api_root, command = %command, "authguard starting");

    match (command.as_str(), &args[1..]) {
        ("login", []) => {
            if !guard.show_login_dialog().await {
                bail!("Login cancelled");
            }
            print_user(&guard);
        }
        ("login", [username]) => {
            let password = rpassword::prompt_password("Password: ")?;
            guard.login(username, &password).await?;
            print_user(&guard);
        }
        ("logout", []) => {
            guard.logout().await;
            println!("Logged out");
        }
        ("whoami", []) => print_user(&guard),
        ("request", [method, path, rest @ ..]) if rest.len() <= 1 => {
            let method = method
                .to_uppercase()
                .parse::<Method>()
                .with_context(|| format!("Invalid HTTP method: {}", method))?;
            let mut request = ApiRequest::new(method, path.clone());
            if let Some(body) = rest.first() {
                let json = serde_json::from_str(body).context("Request body is not valid JSON")?;
                request = request.with_json(json);
            }

            let response = guard.guard(request).await?;
            eprintln!("{}", response.status);
            println!("{}", response.text());
            if !response.is_success() {
                bail!("Request failed with status {}", response.status);
            }
        }
        ("reset-password", [token]) => {
            let password = rpassword::prompt_password("New password: ")?;
            let confirm = rpassword::prompt_password("Confirm new password: ")?;
            if password != confirm {
                bail!("Passwords don't match");
            }
            guard.reset_password(token, &password).await?;
            println!("Password successfully changed.");
        }
        ("init-config", []) => {
            config.save()?;
            println!("Wrote {}", Config::config_path()?.display());
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", args.join(" "));
        }
    }

    Ok(())
}

fn print_user(guard: &SessionGuard) {
    match guard.current_user() {
        Some(user) if user.administrator => println!("{} (administrator)", user.display_name),
        Some(user) => println!("{}", user.display_name),
        None if guard.session().has_token() => println!("Logged in"),
        None => println!("Not logged in"),
    }
}
