use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use parley::api::{ApiClient, ApiError, Credentials, FeedScope};
use parley::app::App;
use parley::compose::{read_upload, Composer};
use parley::config::Config;
use parley::profile::ProfileEditor;
use parley::session::{CurrentIdentity, Session};
use parley::ui;

/// Environment variable consulted when `--password` is not given.
const PASSWORD_ENV: &str = "PARLEY_PASSWORD";

/// Get the config directory path (~/.config/parley/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("parley");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "parley", about = "Terminal client for a discussion forum")]
struct Args {
    /// Forum server URL (overrides server_url in config.toml)
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    /// Password for signup/login (defaults to $PARLEY_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Open the TUI on this user's discussions instead of the global feed
    #[arg(long, value_name = "USERNAME")]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and log in
    Signup {
        username: String,
        #[arg(long)]
        display_name: String,
    },
    /// Log in and remember the session
    Login { username: String },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List users
    Users {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Post a discussion
    Post {
        content: String,
        /// File to upload and attach
        #[arg(long, value_name = "FILE")]
        attach: Option<PathBuf>,
    },
    /// Update your display name and/or profile image
    Profile {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
    },
}

/// Set the config directory to user-only access.
#[cfg(unix)]
fn restrict_permissions(config_dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(config_dir) {
        Ok(metadata) => {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }
        Err(e) => {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to read config directory metadata"
            );
        }
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_config_dir: &Path) {}

/// Logging is silent unless `RUST_LOG` is set. The TUI owns the terminal, so
/// it logs to a file instead of stderr.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn read_password(flag: Option<String>) -> Result<SecretString> {
    match flag.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
        Some(p) if !p.is_empty() => Ok(SecretString::from(p)),
        _ => bail!("Password required: pass --password or set {}", PASSWORD_ENV),
    }
}

/// Print each field-level validation message, or nothing.
fn print_field_errors(error: &ApiError) {
    for (field, message) in error.field_errors() {
        eprintln!("  {}: {}", field, message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }
    restrict_permissions(&config_dir);

    let log_path = config_dir.join("parley.log");
    init_tracing(args.command.is_none().then_some(log_path.as_path()))?;

    let mut config =
        Config::load(&config_dir.join("config.toml")).context("Failed to load config.toml")?;
    if let Some(server) = args.server {
        config.server_url = server;
    }

    let session_path = config_dir.join("session.json");
    let mut session = Session::load(&session_path);

    let anonymous = ApiClient::new(
        &config.server_url,
        &config.api_prefix,
        config.request_timeout(),
    )
    .context("Failed to create API client")?;
    let client = anonymous
        .clone()
        .with_credentials(session.credentials())
        .context("Failed to attach stored credentials")?;

    match args.command {
        None => {
            let (event_tx, event_rx) = mpsc::channel(32);
            let (feed_tx, feed_rx) = mpsc::channel(32);
            let scope = FeedScope::from_username(args.user);
            let mut app = App::new(client, config, session.as_user(), scope, feed_tx);

            ui::run(&mut app, event_tx, event_rx, feed_rx).await?;
            println!("Goodbye!");
        }

        Some(Command::Signup {
            username,
            display_name,
        }) => {
            let password = read_password(args.password)?;
            if let Err(e) = anonymous.signup(&username, &display_name, &password).await {
                eprintln!("Signup failed: {}", e);
                print_field_errors(&e);
                std::process::exit(1);
            }
            let credentials = Credentials {
                username,
                password: password.clone(),
            };
            let user = anonymous
                .login(&credentials)
                .await
                .context("Account created but login failed")?;
            session = Session::logged_in(user, password);
            session.save(&session_path).context("Failed to save session")?;
            println!("Welcome, {}@{}", session.display_name, session.username);
        }

        Some(Command::Login { username }) => {
            let password = read_password(args.password)?;
            let credentials = Credentials {
                username,
                password: password.clone(),
            };
            let user = anonymous.login(&credentials).await.context("Login failed")?;
            session = Session::logged_in(user, password);
            session.save(&session_path).context("Failed to save session")?;
            println!("Logged in as {}@{}", session.display_name, session.username);
        }

        Some(Command::Logout) => {
            Session::anonymous()
                .save(&session_path)
                .context("Failed to save session")?;
            println!("Logged out");
        }

        Some(Command::Whoami) => match session.as_user() {
            Some(user) => println!("{} (id {})", user.label(), user.id),
            None => println!("anonymous"),
        },

        Some(Command::Users { page, size }) => {
            let size = size.unwrap_or(config.user_page_size);
            let users = client
                .list_users(page, size)
                .await
                .context("User load failed")?;
            for user in &users.content {
                println!("{}", parley::util::one_line(&user.label()));
            }
            println!("-- page {}/{} --", users.number + 1, users.total_pages.max(1));
        }

        Some(Command::Post { content, attach }) => {
            if !session.is_logged_in {
                bail!("Log in first: parley login USERNAME");
            }
            let mut composer = Composer::new();
            composer.set_content(content);

            if let Some(path) = attach {
                let (name, bytes) = read_upload(&path)?;
                let generation = composer
                    .begin_upload()
                    .context("Upload already in progress")?;
                composer.finish_upload(generation, client.upload_attachment(&name, bytes).await);
                if let Some(error) = composer.error() {
                    bail!("Upload failed: {}", error);
                }
            }

            let Some(body) = composer.begin_submit() else {
                bail!("Nothing to submit");
            };
            let result = client.post_discussion(&body).await;
            if let Err(e) = &result {
                print_field_errors(e);
            }
            if !composer.finish_submit(result) {
                let reason = composer
                    .error()
                    .or_else(|| composer.field_error("content"))
                    .unwrap_or("validation failed");
                eprintln!("Post failed: {}", reason);
                std::process::exit(1);
            }
            println!("Posted");
        }

        Some(Command::Profile {
            display_name,
            image,
        }) => {
            let Some(user) = session.as_user() else {
                bail!("Log in first: parley login USERNAME");
            };
            let mut editor = ProfileEditor::new(user);
            editor.begin_edit(session.user_id())?;
            if let Some(name) = display_name {
                editor.set_display_name(name);
            }
            if let Some(path) = image {
                let (_, bytes) = read_upload(&path)?;
                editor.set_image_bytes(&bytes);
            }

            let (id, update) = editor.begin_save()?;
            let result = client.update_user(id, &update).await;
            if let Err(e) = &result {
                print_field_errors(e);
            }
            match editor.finish_save(result) {
                Some(updated) => {
                    session.apply_profile(&updated);
                    session.save(&session_path).context("Failed to save session")?;
                    println!("Profile updated: {}", updated.label());
                }
                None => {
                    eprintln!(
                        "Profile update failed: {}",
                        editor.error().unwrap_or("validation failed")
                    );
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
