use std::sync::Arc;

use bazaar_catalog::Catalog;
use bazaar_ledger::{GroupLedger, WishlistLedger};
use bazaar_store::{FileBucket, FileRowStore, InMemoryBucket, InMemoryRowStore, ObjectBucket, RowStore};
use tracing::info;

use crate::config::BazaarConfig;
use crate::error::SdkResult;

/// What [`Bazaar::start`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartReport {
    /// Demo products inserted by this start. Zero once the catalog is seeded.
    pub seeded_products: usize,
}

/// High-level Bazaar API.
pub struct Bazaar {
    config: BazaarConfig,
    store: Arc<dyn RowStore>,
    bucket: Arc<dyn ObjectBucket>,
    wishlist: WishlistLedger,
    groups: GroupLedger,
    catalog: Catalog,
}

impl Bazaar {
    /// Open the configured store and bucket.
    ///
    /// A file-backed store gets a directory-backed bucket so listing images
    /// outlive the process along with the rows that point at them.
    pub fn open(config: BazaarConfig) -> SdkResult<Self> {
        let store: Arc<dyn RowStore> = match &config.data_path {
            Some(path) => Arc::new(FileRowStore::open(path)?),
            None => Arc::new(InMemoryRowStore::new()),
        };
        let bucket: Arc<dyn ObjectBucket> = match config.image_root() {
            Some(root) => Arc::new(FileBucket::open(
                root,
                config.listing_bucket.clone(),
                config.public_base_url.clone(),
            )?),
            None => Arc::new(InMemoryBucket::new(
                config.listing_bucket.clone(),
                config.public_base_url.clone(),
            )),
        };
        Ok(Self::with_backends(config, store, bucket))
    }

    /// Build on caller-supplied backends.
    pub fn with_backends(
        config: BazaarConfig,
        store: Arc<dyn RowStore>,
        bucket: Arc<dyn ObjectBucket>,
    ) -> Self {
        let wishlist = WishlistLedger::new(Arc::clone(&store));
        let groups = GroupLedger::new(Arc::clone(&store), config.ledger_config());
        let catalog = Catalog::new(Arc::clone(&store), Arc::clone(&bucket), wishlist.clone());
        Self {
            config,
            store,
            bucket,
            wishlist,
            groups,
            catalog,
        }
    }

    /// An in-memory instance with default settings.
    pub fn in_memory() -> Self {
        let config = BazaarConfig::default();
        let store: Arc<dyn RowStore> = Arc::new(InMemoryRowStore::new());
        let bucket: Arc<dyn ObjectBucket> = Arc::new(InMemoryBucket::new(
            config.listing_bucket.clone(),
            config.public_base_url.clone(),
        ));
        Self::with_backends(config, store, bucket)
    }

    /// Startup bootstrap: ensure the default group exists and the demo
    /// catalog is loaded. Safe to run on every start.
    pub async fn start(&self) -> SdkResult<StartReport> {
        self.groups.initialize_default_groups().await;
        let seeded_products = self.catalog.seed_demo_products().await?;
        info!(seeded_products, "bazaar started");
        Ok(StartReport { seeded_products })
    }

    pub fn config(&self) -> &BazaarConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    pub fn bucket(&self) -> &Arc<dyn ObjectBucket> {
        &self.bucket
    }

    pub fn wishlist(&self) -> &WishlistLedger {
        &self.wishlist
    }

    pub fn groups(&self) -> &GroupLedger {
        &self.groups
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl std::fmt::Debug for Bazaar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bazaar")
            .field("config", &self.config)
            .field("bucket", &self.bucket.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use bazaar_catalog::{ImageUpload, ListingDraft};
    use bazaar_ledger::DEFAULT_GROUP_NAME;
    use bazaar_types::{GroupDescriptor, ProductId};

    #[tokio::test]
    async fn start_bootstraps_once() {
        let bazaar = Bazaar::in_memory();
        assert_eq!(bazaar.start().await.unwrap().seeded_products, 6);
        assert_eq!(bazaar.start().await.unwrap().seeded_products, 0);

        let groups = bazaar.groups().get_groups().await;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, DEFAULT_GROUP_NAME);
        assert_eq!(bazaar.catalog().active_listings().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = BazaarConfig {
            data_path: Some(dir.path().join("rows.json")),
            ..BazaarConfig::default()
        };
        let alice = auth::sign_in("alice@example.com", "Alice").unwrap();
        let alice_id = alice.user_id().unwrap().clone();

        let group_id = {
            let bazaar = Bazaar::open(config.clone()).unwrap();
            bazaar.start().await.unwrap();
            bazaar
                .wishlist()
                .toggle(&alice, &ProductId::new("2").unwrap())
                .await
                .unwrap();
            bazaar
                .groups()
                .create_group(GroupDescriptor {
                    name: "Book Club".into(),
                    description: "Monthly reads".into(),
                    category: "Hobbies".into(),
                    is_public: true,
                    created_by: alice_id.clone(),
                })
                .await
                .unwrap()
        };

        let bazaar = Bazaar::open(config).unwrap();
        assert_eq!(bazaar.start().await.unwrap().seeded_products, 0);
        assert!(bazaar
            .wishlist()
            .is_wishlisted(&alice, &ProductId::new("2").unwrap())
            .await
            .unwrap());
        assert!(bazaar.groups().is_user_member(&group_id, &alice_id).await);
        assert_eq!(bazaar.groups().get_groups().await.len(), 2);
    }

    #[tokio::test]
    async fn listing_images_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = BazaarConfig {
            data_path: Some(dir.path().join("rows.json")),
            ..BazaarConfig::default()
        };
        let seller = auth::sign_in("seller@example.com", "Sam").unwrap();
        let draft = ListingDraft {
            title: "Road bike".into(),
            description: "Aluminium frame".into(),
            price: "350".into(),
            condition: "Good".into(),
            category: "Sports".into(),
            location: "Portland, OR".into(),
        };

        let product = {
            let bazaar = Bazaar::open(config.clone()).unwrap();
            bazaar.start().await.unwrap();
            bazaar
                .catalog()
                .create_listing(&seller, &draft, vec![ImageUpload::new("cover.png", "image/png", b"png".to_vec())])
                .await
                .unwrap()
        };

        let prefix = format!("{}/{}/", config.public_base_url, config.listing_bucket);
        let object_path = product.images[0].strip_prefix(&prefix).unwrap().to_string();

        let bucket = FileBucket::open(
            config.image_root().unwrap(),
            config.listing_bucket.clone(),
            config.public_base_url.clone(),
        )
        .unwrap();
        let (data, content_type) = bucket.object(&object_path).await.unwrap().unwrap();
        assert_eq!(&data[..], b"png");
        assert_eq!(content_type, "image/png");

        let reopened = Bazaar::open(config).unwrap();
        let listed = reopened.catalog().get(&product.id).await.unwrap().unwrap();
        assert_eq!(listed.images, product.images);
    }

    #[tokio::test]
    async fn configured_system_user_owns_bootstrap_group() {
        let config = BazaarConfig {
            system_user: "bootstrap".parse().unwrap(),
            ..BazaarConfig::default()
        };
        let bazaar = Bazaar::open(config).unwrap();
        bazaar.start().await.unwrap();
        let groups = bazaar.groups().get_groups().await;
        assert_eq!(groups[0].created_by.as_str(), "bootstrap");
    }
}
