use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bazaar_catalog::{ImageUpload, ListingDraft, SearchQuery};
use bazaar_sdk::{auth, Bazaar, BazaarConfig};
use bazaar_types::{Category, Group, GroupDescriptor, GroupId, GroupMembership, Product, ProductId, Session, UserId};
use colored::Colorize;
use serde::Serialize;

use crate::cli::*;

/// Where the CLI keeps its rows when neither `--data` nor the config says.
const DEFAULT_DATA_FILE: &str = "bazaar-data.json";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data)?;
    tracing::debug!(data = ?config.data_path, "opening store");
    let bazaar = Bazaar::open(config).context("opening data store")?;
    bazaar.start().await?;

    let session = match &cli.user {
        Some(email) => auth::sign_in(email, "")?,
        None => auth::guest(),
    };
    let out = Output { format: cli.format };

    match cli.command {
        Command::Groups { action } => cmd_groups(&bazaar, &session, action, &out).await,
        Command::Wishlist { action } => cmd_wishlist(&bazaar, &session, action, &out).await,
        Command::Listings => {
            let products = bazaar.catalog().active_listings().await?;
            out.products(&products)
        }
        Command::Search(args) => cmd_search(&bazaar, args, &out).await,
        Command::Sell(args) => cmd_sell(&bazaar, &session, args, &out).await,
        Command::Archive(args) => {
            let product = bazaar
                .catalog()
                .archive_listing(&session, &args.product.parse()?)
                .await?;
            out.emit(&product, || {
                println!("{} Archived {}", "✓".green().bold(), product.title.yellow());
            })
        }
    }
}

fn load_config(path: Option<&Path>, data: Option<PathBuf>) -> anyhow::Result<BazaarConfig> {
    let mut config = match path {
        Some(path) => BazaarConfig::load(path)?,
        None => BazaarConfig::default(),
    };
    if let Some(data) = data {
        config.data_path = Some(data);
    }
    if config.data_path.is_none() {
        config.data_path = Some(PathBuf::from(DEFAULT_DATA_FILE));
    }
    Ok(config)
}

fn signed_in(session: &Session) -> anyhow::Result<UserId> {
    match session.user_id() {
        Some(id) => Ok(id.clone()),
        None => bail!("sign in first: pass --user <email>"),
    }
}

async fn cmd_groups(bazaar: &Bazaar, session: &Session, action: GroupsAction, out: &Output) -> anyhow::Result<()> {
    let groups = bazaar.groups();
    match action {
        GroupsAction::Init => {
            groups.initialize_default_groups().await;
            out.groups(&groups.get_groups().await)
        }
        GroupsAction::List => out.groups(&groups.get_groups().await),
        GroupsAction::Create(args) => {
            let descriptor = GroupDescriptor {
                name: args.name,
                description: args.description,
                category: args.category,
                is_public: !args.private,
                created_by: signed_in(session)?,
            };
            let Some(id) = groups.create_group(descriptor).await else {
                bail!("group was not created; run with -v for details");
            };
            match groups.get_group_by_id(&id).await {
                Some(group) => out.emit(&group, || {
                    println!("{} Created group {} ({})", "✓".green().bold(), group.name.yellow(), group.id);
                }),
                None => bail!("group {id} was created but could not be read back"),
            }
        }
        GroupsAction::Join { group } => {
            let id: GroupId = group.parse()?;
            let user = signed_in(session)?;
            if !groups.join_group(&id, &user).await {
                bail!("could not join group {id}");
            }
            let joined = groups.get_group_by_id(&id).await;
            out.emit(&joined, || match &joined {
                Some(g) => println!("{} Joined {} ({} members)", "✓".green().bold(), g.name.yellow(), g.member_count),
                None => println!("{} Joined {id}", "✓".green().bold()),
            })
        }
        GroupsAction::Mine => {
            let user = signed_in(session)?;
            out.groups(&groups.get_user_groups(&user).await)
        }
        GroupsAction::Members { group } => {
            let id: GroupId = group.parse()?;
            out.members(&groups.get_members(&id).await)
        }
        GroupsAction::Reconcile { group } => {
            let id: GroupId = group.parse()?;
            let Some(count) = groups.reconcile_member_count(&id).await else {
                bail!("could not reconcile group {id}");
            };
            out.emit(&count, || println!("{} {id}: {count} members", "✓".green().bold()))
        }
    }
}

async fn cmd_wishlist(bazaar: &Bazaar, session: &Session, action: WishlistAction, out: &Output) -> anyhow::Result<()> {
    match action {
        WishlistAction::Toggle { product } => {
            let id: ProductId = product.parse()?;
            let saved = bazaar.wishlist().toggle(session, &id).await?;
            out.emit(&saved, || {
                if saved {
                    println!("{} Saved {}", "♥".red().bold(), id);
                } else {
                    println!("Removed {id} from wishlist");
                }
            })
        }
        WishlistAction::List => {
            let products = bazaar.catalog().wishlist_products(session).await?;
            out.products(&products)
        }
    }
}

async fn cmd_search(bazaar: &Bazaar, args: SearchArgs, out: &Output) -> anyhow::Result<()> {
    let category: Option<Category> = args.category.as_deref().map(str::parse::<Category>).transpose()?;
    let query = SearchQuery {
        term: args.term.unwrap_or_default(),
        category,
    };
    let products = bazaar.catalog().search(&query).await?;
    out.products(&products)
}

async fn cmd_sell(bazaar: &Bazaar, session: &Session, args: SellArgs, out: &Output) -> anyhow::Result<()> {
    let draft = ListingDraft {
        title: args.title,
        description: args.description,
        price: args.price,
        condition: args.condition,
        category: args.category,
        location: args.location,
    };
    let images = args
        .images
        .iter()
        .map(|path| read_image(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let product = bazaar.catalog().create_listing(session, &draft, images).await?;
    out.emit(&product, || {
        println!("{} Listed {} for {}", "✓".green().bold(), product.title.yellow(), product.price_display());
        println!("  Id: {}", product.id.to_string().cyan());
        for url in &product.images {
            println!("  Image: {}", url.blue());
        }
    })
}

fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let content_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ImageUpload::new(file_name, content_type, bytes))
}

struct Output {
    format: OutputFormat,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(),
        }
        Ok(())
    }

    fn groups(&self, groups: &[Group]) -> anyhow::Result<()> {
        self.emit(&groups, || {
            if groups.is_empty() {
                println!("No groups.");
            }
            for g in groups {
                let visibility = if g.is_public { "public".green() } else { "private".dimmed() };
                println!(
                    "{}  {}  [{}] {} members, {}",
                    g.id.to_string().dimmed(),
                    g.name.yellow().bold(),
                    g.category,
                    g.member_count,
                    visibility
                );
                if !g.description.is_empty() {
                    println!("    {}", g.description);
                }
            }
        })
    }

    fn members(&self, members: &[GroupMembership]) -> anyhow::Result<()> {
        self.emit(&members, || {
            if members.is_empty() {
                println!("No members.");
            }
            for m in members {
                println!(
                    "{}  {}  joined {}",
                    m.user_id.as_str().bold(),
                    m.role.to_string().cyan(),
                    m.joined_at.format("%Y-%m-%d")
                );
            }
        })
    }

    fn products(&self, products: &[Product]) -> anyhow::Result<()> {
        self.emit(&products, || {
            if products.is_empty() {
                println!("No products.");
            }
            for p in products {
                let archived = if p.is_archived { " (archived)".dimmed().to_string() } else { String::new() };
                println!(
                    "{:>4}  {}  {}  {}  {}{}",
                    p.id.as_str().dimmed(),
                    p.title.yellow().bold(),
                    p.price_display().green(),
                    p.condition,
                    p.location,
                    archived
                );
            }
        })
    }
}
