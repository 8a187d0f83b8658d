pub mod attachment;
pub mod clone;
pub mod comment;
pub mod create;
pub mod get;
pub mod link;
pub mod search;
pub mod update;

use colored::Colorize;
use jiraclone_core::atlassian::jira::{comment_plain_text, TicketOutput};

use crate::prelude::{println, *};

/// Jira commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Get detailed information about a Jira ticket
    #[clap(name = "get")]
    Get(get::GetOptions),

    /// Search Jira issues using JQL
    #[clap(name = "search")]
    Search(search::SearchOptions),

    /// Create a new Jira ticket
    #[clap(name = "create")]
    Create(create::CreateOptions),

    /// Update Jira ticket fields
    #[clap(name = "update")]
    Update(update::UpdateOptions),

    /// Add or find comments on a Jira ticket
    #[command(subcommand)]
    Comment(comment::CommentCommands),

    /// Link tickets and inspect links
    #[command(subcommand)]
    Link(link::LinkCommands),

    /// Manage attachments on Jira tickets
    #[command(subcommand)]
    Attachment(attachment::AttachmentCommands),

    /// Clone tickets into another project, with attachments and a link back
    #[clap(name = "clone")]
    Clone(clone::CloneOptions),
}

impl Commands {
    pub fn reads_settings_file(&self) -> bool {
        matches!(self, Commands::Clone(options) if options.config.is_some())
    }
}

/// Run Jira commands
pub async fn run(cmd: Commands, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Running Jira command...");
    }

    match cmd {
        Commands::Get(options) => get::handler(options).await,
        Commands::Search(options) => search::handler(options).await,
        Commands::Create(options) => create::handler(options).await,
        Commands::Update(options) => update::handler(options).await,
        Commands::Comment(cmd) => comment::handler(cmd).await,
        Commands::Link(cmd) => link::handler(cmd).await,
        Commands::Attachment(cmd) => attachment::handler(cmd).await,
        Commands::Clone(options) => clone::handler(options, global).await,
    }
}

/// Display a ticket's details as a formatted CLI table.
///
/// Renders the standard ticket view used by the get and create handlers:
/// header line, metadata table, description, labels, links, attachments, and comments.
fn display_ticket(ticket: &TicketOutput) {
    println!(
        "\n{} - {}\n",
        ticket.key.bold().cyan(),
        ticket.summary.bright_white()
    );

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Status".bold().cyan(),
        ticket.status.green().to_string()
    ]);

    if let Some(priority) = &ticket.priority {
        table.add_row(prettytable::row![
            "Priority".bold().cyan(),
            priority.bright_yellow().to_string()
        ]);
    }

    if let Some(issue_type) = &ticket.issue_type {
        table.add_row(prettytable::row![
            "Type".bold().cyan(),
            issue_type.bright_blue().to_string()
        ]);
    }

    let assignee = match ticket.assignee.as_deref() {
        Some(name) => name.bright_magenta().to_string(),
        None => "Unassigned".bright_black().to_string(),
    };
    table.add_row(prettytable::row!["Assignee".bold().cyan(), assignee]);

    for (label, value) in [("Created", &ticket.created), ("Updated", &ticket.updated)] {
        if let Some(value) = value {
            table.add_row(prettytable::row![
                label.bold().cyan(),
                value.bright_black().to_string()
            ]);
        }
    }

    if let Some(due_date) = &ticket.due_date {
        table.add_row(prettytable::row![
            "Due Date".bold().cyan(),
            due_date.yellow().to_string()
        ]);
    }

    table.printstd();

    if let Some(description) = &ticket.description {
        println!("\n{}:", "Description".bold().cyan());
        println!("{}\n", description);
    }

    if !ticket.labels.is_empty() {
        println!(
            "\n{}: {}",
            "Labels".bold().cyan(),
            ticket.labels.join(", ").bright_green()
        );
    }

    if !ticket.links.is_empty() {
        println!("\n{}:", "Links".bold().cyan());
        for link in &ticket.links {
            println!(
                "  {} {} {} {}",
                link.link_type.bright_blue(),
                f!("({})", link.direction).bright_black(),
                link.issue_key.green(),
                link.summary
            );
        }
    }

    if !ticket.attachments.is_empty() {
        println!("\n{}:", "Attachments".bold().cyan());
        for att in &ticket.attachments {
            println!(
                "  {} {} ({}, {})",
                att.id.bright_black(),
                att.filename.bright_white(),
                att.size_human,
                att.mime_type.bright_blue()
            );
        }
    }

    if !ticket.comments.is_empty() {
        println!("\n{}", "Comments:".bold().cyan());
        for (index, comment) in ticket.comments.iter().enumerate() {
            let author = comment
                .author
                .as_ref()
                .and_then(|a| a.display_name.clone())
                .unwrap_or_else(|| "Unknown".to_string());

            println!(
                "{} {} {}",
                f!("{}.", index + 1).green(),
                f!("[{}]", comment.created_at).blue(),
                author.magenta()
            );
            println!("{}\n", comment_plain_text(&comment.body));
        }
    }

    println!();
}
