use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bazaar",
    about = "Bazaar: a community marketplace with wishlists and groups",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON data file; overrides `data_path` from the config
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Act as the user signed in with this email
    #[arg(long, global = true)]
    pub user: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create, join and inspect groups
    Groups {
        #[command(subcommand)]
        action: GroupsAction,
    },
    /// Save products for later
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// List active listings, newest first
    Listings,
    /// Search active listings
    Search(SearchArgs),
    /// Put an item up for sale
    Sell(SellArgs),
    /// Take one of your listings down
    Archive(ArchiveArgs),
}

#[derive(Subcommand)]
pub enum GroupsAction {
    /// Create the default groups if missing
    Init,
    /// List every group
    List,
    /// Create a group owned by the current user
    Create(CreateGroupArgs),
    /// Join a group
    Join { group: String },
    /// Groups the current user belongs to
    Mine,
    /// Members of a group
    Members { group: String },
    /// Recount a group's members
    Reconcile { group: String },
}

#[derive(Args)]
pub struct CreateGroupArgs {
    pub name: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    #[arg(short, long, default_value = "General")]
    pub category: String,
    /// Hide the group from public listings
    #[arg(long)]
    pub private: bool,
}

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Save or unsave a product
    Toggle { product: String },
    /// Show saved products
    List,
}

#[derive(Args)]
pub struct SearchArgs {
    pub term: Option<String>,
    #[arg(short, long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct SellArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    /// Asking price in dollars
    #[arg(long)]
    pub price: String,
    #[arg(long, default_value = "Good")]
    pub condition: String,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub location: String,
    /// Image files to attach; the first is the cover
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ArchiveArgs {
    pub product: String,
}
