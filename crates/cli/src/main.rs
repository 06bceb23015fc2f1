use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use shelfbot_app::{Dispatcher, Reply, Update};
use shelfbot_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelfbot", version, about = "Personal book catalogue bot")]
struct Cli {
    /// Catalogue file to use instead of the configured one
    #[arg(long, global = true)]
    catalogue: Option<PathBuf>,

    /// Log at info level instead of warnings only
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP webhook server
    Serve,
    /// Talk to the bot from the terminal
    Chat {
        /// User id the conversation is attributed to
        #[arg(long, default_value_t = 1)]
        user: u64,
    },
    /// Print the catalogue
    Books,
    /// Print one book by its zero-based position
    Show { index: usize },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load shelfbot settings")?;
    if let Some(path) = cli.catalogue {
        settings.storage.catalogue_path = path;
    }
    if !cli.verbose && std::env::var_os("RUST_LOG").is_none() {
        settings.telemetry.log_filter = "warn".to_string();
    }

    match cli.command {
        Command::Serve => shelfbot_app::serve(settings).await,
        Command::Chat { user } => {
            let dispatcher = shelfbot_app::standalone_dispatcher(&settings).await?;
            chat(&dispatcher, user).await
        }
        Command::Books => {
            let dispatcher = shelfbot_app::standalone_dispatcher(&settings).await?;
            let books = dispatcher.store().list_books().await?;
            if books.is_empty() {
                println!("The catalogue is empty.");
            }
            for (index, book) in books.iter().enumerate() {
                println!("{index:>3}  {}  ({})", book.name, book.authors.join(", "));
            }
            Ok(())
        }
        Command::Show { index } => {
            let dispatcher = shelfbot_app::standalone_dispatcher(&settings).await?;
            let book = dispatcher.store().get_book(index).await?;
            print!("{}", shelfbot_app::modules::books::presenter::details_text(&book));
            println!("Poster: {}", book.poster);
            Ok(())
        }
    }
}

/// Line-based conversation: each line is a message. While no form is open,
/// `book:<n>` lines select a list entry.
async fn chat(dispatcher: &Dispatcher, user: u64) -> anyhow::Result<()> {
    println!("Chatting as user {user}. Type /help for commands, Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let selecting = !dispatcher.sessions().is_active(user);
        let update = if selecting && line.trim_start().starts_with("book:") {
            Update::selection(user, line.trim())
        } else {
            Update::message(user, line)
        };

        for reply in dispatcher.dispatch(&update).await {
            print_reply(&reply);
        }
    }

    tracing::info!(user_id = user, "chat ended");
    Ok(())
}

fn print_reply(reply: &Reply) {
    println!("{}", reply.text.trim_end());
    for button in &reply.buttons {
        println!("  [{}] {}", button.callback, button.label);
    }
    if let Some(photo) = &reply.photo {
        println!("  (cover {} attached, {} bytes)", photo.filename, photo.data.len());
    }
}
