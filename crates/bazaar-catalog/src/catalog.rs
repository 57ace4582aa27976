use std::sync::Arc;

use bazaar_ledger::WishlistLedger;
use bazaar_store::{CasOutcome, ObjectBucket, RowStore, StoreError, Table};
use bazaar_types::{Product, ProductId, Record, Session, UserId};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::listing::{check_images, image_path, validate, ImageUpload, ListingDraft};
use crate::search::SearchQuery;
use crate::seed::demo_products;

/// Attempts at archiving before giving up on a row that keeps changing.
const ARCHIVE_ATTEMPTS: u32 = 8;

/// Listings and their images.
#[derive(Clone)]
pub struct Catalog {
    products: Table<Product>,
    images: Arc<dyn ObjectBucket>,
    wishlist: WishlistLedger,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("products", &self.products)
            .field("images", &self.images.name())
            .finish()
    }
}

fn seller(session: &Session) -> CatalogResult<&UserId> {
    session
        .user_id()
        .ok_or(CatalogError::AuthenticationRequired)
}

fn newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl Catalog {
    pub fn new(store: Arc<dyn RowStore>, images: Arc<dyn ObjectBucket>, wishlist: WishlistLedger) -> Self {
        Self {
            products: Table::new(store),
            images,
            wishlist,
        }
    }

    pub async fn get(&self, product_id: &ProductId) -> CatalogResult<Option<Product>> {
        Ok(self
            .products
            .get(product_id.as_str())
            .await?
            .map(|row| row.value))
    }

    /// Every product that is not archived, newest first.
    pub async fn active_listings(&self) -> CatalogResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .all()
            .await?
            .into_iter()
            .map(|row| row.value)
            .filter(|p| !p.is_archived)
            .collect();
        newest_first(&mut products);
        Ok(products)
    }

    /// Active listings matching `query`, newest first.
    pub async fn search(&self, query: &SearchQuery) -> CatalogResult<Vec<Product>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .active_listings()
            .await?
            .into_iter()
            .filter(|p| query.matches(p))
            .collect())
    }

    /// Publish a listing for the session's user.
    ///
    /// The draft and images are checked before anything is uploaded. Images
    /// are uploaded in order and the first becomes the cover.
    pub async fn create_listing(
        &self,
        session: &Session,
        draft: &ListingDraft,
        images: Vec<ImageUpload>,
    ) -> CatalogResult<Product> {
        let seller_id = seller(session)?.clone();
        let listing = validate(draft)?;
        check_images(&images)?;

        let id = ProductId::new(Uuid::now_v7().to_string()).map_err(|e| CatalogError::Invalid {
            field: "id",
            reason: e.to_string(),
        })?;

        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            let path = image_path(&id, &image);
            let url = self
                .images
                .upload(&path, image.bytes, &image.content_type)
                .await
                .map_err(|e| {
                    warn!(op = "create_listing", product = %id, path = %path, error = %e, "image upload failed");
                    e
                })?;
            urls.push(url);
        }

        let product = Product {
            id,
            title: listing.title,
            description: listing.description,
            price_cents: listing.price_cents,
            category: listing.category,
            images: urls,
            seller_id,
            location: listing.location,
            condition: listing.condition,
            created_at: Utc::now(),
            is_archived: false,
        };
        let stored = self.products.insert_if_absent(&product).await?.into_inner();
        info!(
            product = %stored.value.id,
            seller = %stored.value.seller_id,
            images = stored.value.images.len(),
            "listing created"
        );
        Ok(stored.value)
    }

    /// Hide a listing from browse and search. Only its seller may do this.
    ///
    /// Archiving an archived listing returns it unchanged.
    pub async fn archive_listing(&self, session: &Session, product_id: &ProductId) -> CatalogResult<Product> {
        let user = seller(session)?;
        let mut current = self.products.get(product_id.as_str()).await?;
        for _ in 0..ARCHIVE_ATTEMPTS {
            let row = current.ok_or_else(|| CatalogError::NotFound(product_id.clone()))?;
            if &row.value.seller_id != user {
                return Err(CatalogError::NotSeller(product_id.clone()));
            }
            if row.value.is_archived {
                return Ok(row.value);
            }
            let mut product = row.value;
            product.is_archived = true;
            match self.products.compare_and_swap(row.version, &product).await? {
                CasOutcome::Swapped(stored) => {
                    debug!(product = %product_id, seller = %user, "listing archived");
                    return Ok(stored.value);
                }
                CasOutcome::Stale(latest) => current = latest,
            }
        }
        Err(StoreError::Contention {
            collection: Product::COLLECTION.into(),
            key: product_id.to_string(),
            attempts: ARCHIVE_ATTEMPTS,
        }
        .into())
    }

    /// The products on the session's wishlist, in the order they were saved.
    ///
    /// Entries whose product no longer exists are skipped. Archived products
    /// are kept so the user can see what they saved.
    pub async fn wishlist_products(&self, session: &Session) -> CatalogResult<Vec<Product>> {
        let ids = self.wishlist.product_ids(session).await?;
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id).await? {
                Some(product) => products.push(product),
                None => debug!(product = %id, "wishlisted product no longer exists"),
            }
        }
        Ok(products)
    }

    /// Insert the demo catalog. Products already present are left alone.
    ///
    /// Returns how many products were inserted.
    pub async fn seed_demo_products(&self) -> CatalogResult<usize> {
        let mut inserted = 0;
        for product in demo_products() {
            if self.products.insert_if_absent(&product).await?.was_inserted() {
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!(inserted, "seeded demo catalog");
        }
        Ok(inserted)
    }
}
