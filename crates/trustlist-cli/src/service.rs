//! `trustlist service`: view and edit the service directory.
//!
//! Every edit fetches the current document, applies one tree-editor
//! command locally, then saves the full document with the fetched version.
//! Validation errors are reported before anything is sent. When the save
//! fails the document is fetched again so the next command starts from the
//! server's copy.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use serde_json::Value;

use trustlist_core::editor::{self, DetailFields, EditCommand, TopLevelFields};
use trustlist_core::model::{Detail, Promo, ServiceDocument};

use crate::{BOLD, CYAN, Client, DIM, RESET, WHITE, header, kv_line, success, warning};

#[derive(Subcommand)]
pub enum ServiceCommands {
    /// Show the service document.
    Show {
        /// Print the raw JSON document.
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Replace the whole document with the JSON in a file.
    Set {
        /// Path to a JSON document, e.g. one saved from `service show --json`.
        #[arg(long)]
        file: PathBuf,
    },
    /// Change the image link and/or the promo block.
    #[command(name = "set-fields")]
    SetFields {
        /// Target of the headline button.
        #[arg(long)]
        image_link: Option<String>,
        /// Promo text.
        #[arg(long)]
        promo_content: Option<String>,
        /// Promo target.
        #[arg(long)]
        promo_link: Option<String>,
    },
    /// Append a card.
    #[command(name = "add-card")]
    AddCard {
        /// Card title.
        text: String,
        /// A detail as 'heading|description|link'. Repeatable.
        #[arg(long = "detail", required = true)]
        details: Vec<String>,
    },
    /// Rename a card.
    #[command(name = "rename-card")]
    RenameCard {
        /// Card index (from `service show`).
        card: usize,
        /// New title.
        text: String,
    },
    /// Delete a card and all of its details.
    #[command(name = "delete-card")]
    DeleteCard {
        /// Card index (from `service show`).
        card: usize,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },
    /// Append a placeholder detail to a card.
    #[command(name = "add-detail")]
    AddDetail {
        /// Card index.
        card: usize,
    },
    /// Change fields of one detail.
    #[command(name = "update-detail")]
    UpdateDetail {
        /// Card index.
        card: usize,
        /// Detail index within the card.
        detail: usize,
        /// New heading.
        #[arg(long)]
        heading: Option<String>,
        /// New description.
        #[arg(long)]
        body: Option<String>,
        /// New link.
        #[arg(long)]
        link: Option<String>,
    },
    /// Delete one detail.
    #[command(name = "delete-detail")]
    DeleteDetail {
        /// Card index.
        card: usize,
        /// Detail index within the card.
        detail: usize,
    },
}

pub async fn run(client: &Client, action: ServiceCommands) -> Result<()> {
    match action {
        ServiceCommands::Show { json } => {
            let doc = fetch(client).await?;
            if json {
                let raw = serde_json::to_string_pretty(&doc).context("failed to format JSON")?;
                println!("{raw}");
            } else {
                print_document(&doc);
            }
            Ok(())
        }
        ServiceCommands::Set { file } => cmd_set(client, &file).await,
        ServiceCommands::SetFields {
            image_link,
            promo_content,
            promo_link,
        } => {
            let doc = fetch(client).await?;
            let promo = (promo_content.is_some() || promo_link.is_some()).then(|| Promo {
                content: promo_content.unwrap_or_else(|| doc.promo.content.clone()),
                link: promo_link.unwrap_or_else(|| doc.promo.link.clone()),
            });
            let fields = TopLevelFields { image_link, promo };
            apply_and_save(client, doc, EditCommand::SetTopLevelFields { fields }).await
        }
        ServiceCommands::AddCard { text, details } => {
            let details = details
                .iter()
                .map(String::as_str)
                .map(parse_detail)
                .collect::<Result<Vec<_>>>()?;
            let doc = fetch(client).await?;
            apply_and_save(client, doc, EditCommand::AddCard { text, details }).await
        }
        ServiceCommands::RenameCard { card, text } => {
            let doc = fetch(client).await?;
            apply_and_save(
                client,
                doc,
                EditCommand::UpdateCardText {
                    card_index: card,
                    text,
                },
            )
            .await
        }
        ServiceCommands::DeleteCard { card, yes } => {
            let doc = fetch(client).await?;
            if let Some(target) = doc.cards.get(card) {
                if !yes && !confirm(&format!(
                    "Delete card '{}' and its {} detail(s)?",
                    target.text,
                    target.details.len()
                ))? {
                    bail!("aborted");
                }
            }
            apply_and_save(client, doc, EditCommand::DeleteCard { card_index: card }).await
        }
        ServiceCommands::AddDetail { card } => {
            let doc = fetch(client).await?;
            apply_and_save(client, doc, EditCommand::AddDetail { card_index: card }).await
        }
        ServiceCommands::UpdateDetail {
            card,
            detail,
            heading,
            body,
            link,
        } => {
            let doc = fetch(client).await?;
            let fields = DetailFields {
                heading,
                body,
                link,
            };
            apply_and_save(
                client,
                doc,
                EditCommand::UpdateDetail {
                    card_index: card,
                    detail_index: detail,
                    fields,
                },
            )
            .await
        }
        ServiceCommands::DeleteDetail { card, detail } => {
            let doc = fetch(client).await?;
            apply_and_save(
                client,
                doc,
                EditCommand::DeleteDetail {
                    card_index: card,
                    detail_index: detail,
                },
            )
            .await
        }
    }
}

/// Parse `heading|description|link`. Blank parts are kept and dropped later
/// by the editor.
pub fn parse_detail(raw: &str) -> Result<Detail> {
    let mut parts = raw.splitn(3, '|');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(heading), Some(body), Some(link)) => {
            Ok(Detail::new(heading.trim(), body.trim(), link.trim()))
        }
        _ => bail!("detail must look like 'heading|description|link', got '{raw}'"),
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush().context("failed to flush stdout")?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn fetch(client: &Client) -> Result<ServiceDocument> {
    let resp = client.get("/api/service").await?;
    match resp.get("service") {
        None | Some(Value::Null) => Ok(ServiceDocument::default()),
        Some(doc) => serde_json::from_value(doc.clone()).context("unexpected service payload"),
    }
}

/// POST `body` as the new document. On failure, reload the server copy
/// before returning the error.
async fn save(client: &Client, body: &Value) -> Result<ServiceDocument> {
    match client.post("/api/service", body).await {
        Ok(resp) => serde_json::from_value(resp.get("service").cloned().unwrap_or_default())
            .context("unexpected service payload"),
        Err(e) => {
            match fetch(client).await {
                Ok(fresh) => warning(&format!(
                    "save failed; reloaded server copy (version {})",
                    fresh.version
                )),
                Err(reload) => warning(&format!("save failed and reload failed: {reload:#}")),
            }
            Err(e)
        }
    }
}

async fn apply_and_save(client: &Client, doc: ServiceDocument, command: EditCommand) -> Result<()> {
    let next = editor::apply(doc, command)?;
    let body = serde_json::to_value(&next).context("failed to encode document")?;
    let saved = save(client, &body).await?;

    println!();
    success(&format!("service document saved (version {})", saved.version));
    println!();
    Ok(())
}

async fn cmd_set(client: &Client, file: &std::path::Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let body: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let parsed: ServiceDocument = serde_json::from_value(body.clone())
        .with_context(|| format!("{} is not a service document", file.display()))?;

    let saved = save(client, &body).await?;
    println!();
    success(&format!(
        "service document replaced with {} card(s) (version {})",
        parsed.cards.len(),
        saved.version
    ));
    println!();
    Ok(())
}

fn print_document(doc: &ServiceDocument) {
    println!();
    header("📋", "Service directory");
    kv_line("Version", &doc.version.to_string());
    kv_line("Image link", &editor::normalize_link(&doc.image_link));
    kv_line("Promo", &doc.promo.content);
    kv_line("Promo link", &editor::normalize_link(&doc.promo.link));
    println!();

    if doc.cards.is_empty() {
        println!("  {DIM}(no cards){RESET}");
    }
    for (ci, card) in doc.cards.iter().enumerate() {
        println!("  {BOLD}{WHITE}[{ci}] {}{RESET}", card.text);
        for (di, detail) in card.details.iter().enumerate() {
            println!("      {DIM}[{di}]{RESET} {BOLD}{}{RESET}", detail.heading);
            println!("          {}", detail.body);
            println!("          {CYAN}{}{RESET}", editor::normalize_link(&detail.link));
        }
    }
    println!();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_detail_triples() {
        let detail = parse_detail(" SOC2 | Readiness reviews | example.com/soc2 ").unwrap();
        assert_eq!(detail.heading, "SOC2");
        assert_eq!(detail.body, "Readiness reviews");
        assert_eq!(detail.link, "example.com/soc2");
    }

    #[test]
    fn link_may_contain_pipes() {
        let detail = parse_detail("h|b|example.com/?a=1|2").unwrap();
        assert_eq!(detail.link, "example.com/?a=1|2");
    }

    #[test]
    fn rejects_short_details() {
        assert!(parse_detail("heading|body").is_err());
        assert!(parse_detail("").is_err());
    }
}
