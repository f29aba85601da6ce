//! `trustlist` CLI, the admin client for a Trust-List server.
//!
//! Talks to the server over its JSON API. Structural edits to the service
//! document are computed locally with the tree editor from `trustlist-core`
//! and saved as a whole-document replace carrying the fetched version.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod service;

use std::io::Read as _;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use trustlist_core::credentials::{BcryptHasher, PasswordHasher};
use trustlist_core::model::{NavKind, NavbarItem, NavbarPatch};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// Trust-List admin client.
#[derive(Parser)]
#[command(
    name = "trustlist",
    version,
    about = "Trust-List CLI: manage the navbar and the service directory",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         TRUSTLIST_ADDR    Server address (default: http://127.0.0.1:3000)\n  \
         TRUSTLIST_TOKEN   Admin token from `trustlist login`\n\n\
         {DIM}Examples:{RESET}\n  \
         trustlist login --email ops@example.com\n  \
         trustlist navbar seed\n  \
         trustlist service add-card Audit --detail 'SOC2|Readiness reviews|example.com/soc2'"
    ),
)]
struct Cli {
    /// Trust-List server address.
    #[arg(long, env = "TRUSTLIST_ADDR", default_value = "http://127.0.0.1:3000")]
    addr: String,

    /// Admin token.
    #[arg(long, env = "TRUSTLIST_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print a token.
    Login {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password (read from stdin if omitted).
        #[arg(long, env = "TRUSTLIST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Print only the token.
        #[arg(long, default_value = "false")]
        raw: bool,
    },
    /// Show the role the server derives from the current token.
    Session,
    /// Hash a password for `TRUSTLIST_ADMIN_PASSWORD_HASH`.
    #[command(name = "hash-password")]
    HashPassword {
        /// Password to hash (read from stdin if omitted).
        password: Option<String>,
        /// bcrypt cost factor.
        #[arg(long, default_value = "12")]
        cost: u32,
    },
    /// Navbar operations.
    Navbar {
        #[command(subcommand)]
        action: NavbarCommands,
    },
    /// Service directory operations.
    Service {
        #[command(subcommand)]
        action: service::ServiceCommands,
    },
}

#[derive(Subcommand)]
enum NavbarCommands {
    /// List navbar items in display order.
    List,
    /// Replace the navbar with the default item set.
    Seed,
    /// Update one navbar item.
    Update {
        /// Item id (from `navbar list`).
        id: String,
        /// New label.
        #[arg(long)]
        text: Option<String>,
        /// New target.
        #[arg(long)]
        href: Option<String>,
        /// New sort position.
        #[arg(long, allow_negative_numbers = true)]
        order: Option<i64>,
        /// `link` or `button`.
        #[arg(long)]
        kind: Option<String>,
    },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_navbar(items: &[NavbarItem]) {
    if items.is_empty() {
        println!("  {DIM}(no items, run `trustlist navbar seed`){RESET}");
        return;
    }
    for item in items {
        let kind = match item.kind {
            NavKind::Link => "link",
            NavKind::Button => "button",
        };
        println!(
            "  {DIM}{order:>3}{RESET}  {WHITE}{BOLD}{label:<12}{RESET} {CYAN}{href:<12}{RESET} {DIM}{kind:<6} {id}{RESET}",
            order = item.order,
            label = item.label,
            href = item.href,
            id = item.id,
        );
    }
}

// ── HTTP client ──────────────────────────────────────────────────────

struct Client {
    http: reqwest::Client,
    addr: String,
    token: Option<String>,
}

impl Client {
    fn new(addr: String, token: Option<String>) -> Self {
        let http = reqwest::Client::new();
        let addr = addr.trim_end_matches('/').to_owned();
        Self { http, addr, token }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.addr)
    }

    fn auth_header(&self) -> Result<String> {
        self.token
            .as_deref()
            .map(|t| format!("Bearer {t}"))
            .ok_or_else(|| anyhow::anyhow!("no token provided; set TRUSTLIST_TOKEN or use --token"))
    }

    /// GET a public route. The token is sent along when present.
    async fn get(&self, path: &str) -> Result<Value> {
        let mut req = self.http.get(self.url(path));
        if let Ok(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }
        let resp = req.send().await.context("request failed")?;
        handle_response(resp).await
    }

    async fn get_admin(&self, path: &str) -> Result<Value> {
        let auth = self.auth_header()?;
        let resp = self
            .http
            .get(self.url(path))
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let auth = self.auth_header()?;
        let resp = self
            .http
            .post(self.url(path))
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(body)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let auth = self.auth_header()?;
        let resp = self
            .http
            .put(self.url(path))
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(body)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn post_no_auth(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await.context("failed to read response body")?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or(body);
        bail!("server returned {status}: {message}");
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).context("failed to parse response JSON")
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = Client::new(cli.addr, cli.token);

    match run(client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(client: Client, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Login {
            email,
            password,
            raw,
        } => cmd_login(&client, &email, password, raw).await,
        Commands::Session => cmd_session(&client).await,
        Commands::HashPassword { password, cost } => cmd_hash_password(password, cost).await,
        Commands::Navbar { action } => cmd_navbar(&client, action).await,
        Commands::Service { action } => service::run(&client, action).await,
    }
}

// ── Auth commands ────────────────────────────────────────────────────

/// Use `given`, or read one line from stdin.
fn password_or_stdin(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read password from stdin")?;
    let password = buf.lines().next().unwrap_or_default().to_owned();
    if password.is_empty() {
        bail!("no password given");
    }
    Ok(password)
}

async fn cmd_login(client: &Client, email: &str, password: Option<String>, raw: bool) -> Result<()> {
    let password = password_or_stdin(password)?;
    let resp = client
        .post_no_auth("/api/login", &json!({"email": email, "password": password}))
        .await?;
    let token = resp
        .get("token")
        .and_then(Value::as_str)
        .context("login response has no token")?;

    if raw {
        println!("{token}");
        return Ok(());
    }

    println!();
    success(&format!("logged in as {email}"));
    println!();
    println!("  {DIM}Set the token with:{RESET}");
    println!();
    println!("    {CYAN}export TRUSTLIST_TOKEN={token}{RESET}");
    println!();
    Ok(())
}

async fn cmd_session(client: &Client) -> Result<()> {
    let resp = client.get("/api/session").await?;
    let role = resp.get("role").and_then(Value::as_str).unwrap_or("guest");
    let is_admin = resp.get("isAdmin").and_then(Value::as_bool).unwrap_or(false);

    println!();
    header("🔑", "Session");
    kv_line("Role", role);
    kv_line("Admin", if is_admin { "yes" } else { "no" });
    println!();
    Ok(())
}

async fn cmd_hash_password(password: Option<String>, cost: u32) -> Result<()> {
    let password = password_or_stdin(password)?;
    let hash = tokio::task::spawn_blocking(move || BcryptHasher::new(cost).hash(&password))
        .await
        .context("hashing task failed")??;
    println!("{hash}");
    Ok(())
}

// ── Navbar commands ──────────────────────────────────────────────────

fn parse_kind(raw: &str) -> Result<NavKind> {
    match raw.to_ascii_lowercase().as_str() {
        "link" => Ok(NavKind::Link),
        "button" => Ok(NavKind::Button),
        other => bail!("unknown navbar item kind '{other}' (expected link or button)"),
    }
}

async fn fetch_navbar(client: &Client) -> Result<Vec<NavbarItem>> {
    let resp = client.get("/api/navbar").await?;
    serde_json::from_value(resp.get("items").cloned().unwrap_or(Value::Array(Vec::new())))
        .context("unexpected navbar payload")
}

async fn cmd_navbar(client: &Client, action: NavbarCommands) -> Result<()> {
    match action {
        NavbarCommands::List => {
            let items = fetch_navbar(client).await?;
            println!();
            header("☰", "Navbar");
            print_navbar(&items);
            println!();
        }
        NavbarCommands::Seed => {
            client.get_admin("/api/navbar/seed").await?;
            let items = fetch_navbar(client).await?;
            println!();
            success(&format!("navbar reseeded with {} items", items.len()));
            print_navbar(&items);
            println!();
        }
        NavbarCommands::Update {
            id,
            text,
            href,
            order,
            kind,
        } => {
            let patch = NavbarPatch {
                kind: kind.as_deref().map(parse_kind).transpose()?,
                label: text,
                href,
                order,
            };
            if patch == NavbarPatch::default() {
                warning("nothing to update; pass --text, --href, --order, or --kind");
                return Ok(());
            }

            let mut body = serde_json::to_value(&patch).context("failed to encode patch")?;
            body["_id"] = Value::String(id);
            let resp = client.put("/api/navbar", &body).await?;
            let item: NavbarItem = serde_json::from_value(resp.get("item").cloned().unwrap_or_default())
                .context("unexpected navbar payload")?;

            println!();
            success("navbar item updated");
            print_navbar(std::slice::from_ref(&item));
            println!();
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_navbar_kinds() {
        assert_eq!(parse_kind("Button").unwrap(), NavKind::Button);
        assert_eq!(parse_kind("link").unwrap(), NavKind::Link);
        assert!(parse_kind("dropdown").is_err());
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = Client::new("http://localhost:3000/".to_owned(), None);
        assert_eq!(client.url("/api/navbar"), "http://localhost:3000/api/navbar");
        assert!(client.auth_header().is_err());
    }
}
