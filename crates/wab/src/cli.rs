use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command line client for the WhatsApp bulk-send bot server.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Bot server base URL (overrides WAB_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Local contact list file (overrides WAB_CONTACTS_FILE)
    #[arg(long, global = true, value_name = "PATH")]
    pub contacts_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show whether the bot is connected
    Status {
        /// Keep polling and print every change until Ctrl-C
        #[arg(long)]
        watch: bool,
    },

    /// Start or close the bot session
    #[command(subcommand)]
    Bot(BotCommand),

    /// Manage the local contact list
    #[command(subcommand)]
    Contacts(ContactsCommand),

    /// Send one message to a phone number or a stored contact
    Send {
        /// Phone number (normalized with the default country code)
        #[arg(required_unless_present = "contact", conflicts_with = "contact")]
        phone: Option<String>,

        /// 1-based index into the local contact list
        #[arg(long, value_name = "INDEX")]
        contact: Option<usize>,

        #[command(flatten)]
        content: Content,
    },

    /// Send to every selected contact, one after another
    Bulk {
        #[command(flatten)]
        content: Content,

        /// Seconds between messages (defaults to WAB_MESSAGE_DELAY_SECS)
        #[arg(long, value_name = "SECS")]
        delay: Option<u64>,
    },

    /// Ask the server to send a message later
    Schedule {
        phone: String,

        #[arg(short, long)]
        message: String,

        /// Local time, YYYY-MM-DDTHH:MM
        #[arg(long, value_name = "TIME")]
        at: String,
    },

    /// Preview which attachment files match which server contacts
    Scan,

    /// Send each server contact the attachment matching their name
    AutoSend {
        #[arg(short, long, default_value = "")]
        message: String,

        /// Seconds between messages
        #[arg(long, default_value_t = 5)]
        delay: u64,
    },

    /// Show dashboard statistics
    Stats,

    /// Manage contacts stored on the server
    #[command(subcommand)]
    ServerContacts(ServerContactsCommand),
}

#[derive(Args, Debug)]
pub struct Content {
    /// Message text; `{name}` is replaced with the contact's name
    #[arg(short, long, default_value = "")]
    pub message: String,

    /// File to attach
    #[arg(short, long, value_name = "PATH")]
    pub attachment: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum BotCommand {
    /// Launch the bot browser session
    Init {
        #[arg(long)]
        headless: bool,
    },
    /// Close the bot session
    Close,
}

#[derive(Subcommand, Debug)]
pub enum ContactsCommand {
    /// List contacts with their selection and status
    List,

    /// Add phone numbers (separate several with commas or newlines)
    Add {
        #[arg(required = true)]
        numbers: Vec<String>,
    },

    /// Import a CSV file (name,phone or phone,name)
    Import { file: PathBuf },

    /// Change a contact's number or name
    Edit {
        index: usize,
        #[arg(long)]
        country_code: String,
        #[arg(long)]
        number: String,
        #[arg(long, default_value = "")]
        name: String,
    },

    Remove { index: usize },

    RemoveSelected,

    Clear,

    /// Toggle selection of a contact
    Select { index: usize },

    SelectAll,

    UnselectAll,
}

#[derive(Subcommand, Debug)]
pub enum ServerContactsCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
    },
    Delete { id: u64 },
    /// Upload a CSV file to the server's contact list
    Import { file: PathBuf },
}
