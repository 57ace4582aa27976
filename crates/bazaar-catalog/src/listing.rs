//! Listing input: the raw sell form, its validation, and image uploads.

use bazaar_types::{Category, Condition, ProductId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

pub const MIN_TITLE_LEN: usize = 5;
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Hex characters of the content hash used in an image's object path.
const IMAGE_HASH_HEX_LEN: usize = 16;

/// The sell form as submitted, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    /// Asking price in dollars, e.g. `"899"` or `"18.50"`.
    pub price: String,
    pub condition: String,
    pub category: String,
    pub location: String,
}

/// A draft that passed [`validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub condition: Condition,
    pub category: Category,
    pub location: String,
}

/// An image attached to a new listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// File extension for the stored object.
    ///
    /// Taken from the file name when it has a plain alphanumeric one,
    /// otherwise from the content type, otherwise `bin`.
    pub fn extension(&self) -> String {
        let from_name = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| is_plain_extension(ext));
        if let Some(ext) = from_name {
            return ext.to_ascii_lowercase();
        }
        match self.content_type.trim().strip_prefix("image/") {
            Some("jpeg") => "jpg".into(),
            Some(sub) if is_plain_extension(sub) => sub.to_ascii_lowercase(),
            _ => "bin".into(),
        }
    }

    fn check(&self) -> CatalogResult<()> {
        if !self.content_type.trim().starts_with("image/") {
            return Err(CatalogError::invalid(
                "images",
                format!("{} is not an image ({})", self.file_name, self.content_type),
            ));
        }
        if self.bytes.is_empty() {
            return Err(CatalogError::invalid(
                "images",
                format!("{} is empty", self.file_name),
            ));
        }
        Ok(())
    }
}

fn is_plain_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Content-addressed object path for `image` under a listing.
///
/// `listings/{product}/{hash}.{ext}`: uploading the same bytes twice for one
/// listing lands on the same object.
pub fn image_path(product_id: &ProductId, image: &ImageUpload) -> String {
    let digest = blake3::hash(&image.bytes);
    let hash = hex::encode(digest.as_bytes());
    format!(
        "listings/{product_id}/{}.{}",
        &hash[..IMAGE_HASH_HEX_LEN],
        image.extension()
    )
}

/// Check every attached image before anything is uploaded.
pub(crate) fn check_images(images: &[ImageUpload]) -> CatalogResult<()> {
    images.iter().try_for_each(ImageUpload::check)
}

/// Parse a dollar amount into cents.
///
/// Accepts an optional leading `$`, comma thousands separators and at most
/// two decimal places. Negative amounts are rejected.
pub fn parse_price(input: &str) -> CatalogResult<u64> {
    let s = input.trim();
    let s = s.strip_prefix('$').unwrap_or(s).replace(',', "");
    if s.starts_with('-') {
        return Err(CatalogError::invalid("price", "must not be negative"));
    }
    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s.as_str(), ""),
    };
    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits(whole) || !digits(frac) {
        return Err(CatalogError::invalid(
            "price",
            format!("{input:?} is not a valid amount"),
        ));
    }
    if frac.len() > 2 {
        return Err(CatalogError::invalid("price", "at most two decimal places"));
    }

    let dollars: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| CatalogError::invalid("price", "amount too large"))?
    };
    let cents: u64 = match frac.len() {
        0 => 0,
        1 => u64::from(frac.as_bytes()[0] - b'0') * 10,
        _ => u64::from(frac.as_bytes()[0] - b'0') * 10 + u64::from(frac.as_bytes()[1] - b'0'),
    };
    dollars
        .checked_mul(100)
        .and_then(|c| c.checked_add(cents))
        .ok_or_else(|| CatalogError::invalid("price", "amount too large"))
}

/// Validate a sell form.
///
/// Text fields are trimmed. The first failing field is reported.
pub fn validate(draft: &ListingDraft) -> CatalogResult<NewListing> {
    let title = draft.title.trim();
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(CatalogError::invalid(
            "title",
            format!("must be at least {MIN_TITLE_LEN} characters"),
        ));
    }
    let description = draft.description.trim();
    if description.chars().count() < MIN_DESCRIPTION_LEN {
        return Err(CatalogError::invalid(
            "description",
            format!("must be at least {MIN_DESCRIPTION_LEN} characters"),
        ));
    }
    let price_cents = parse_price(&draft.price)?;
    let condition: Condition = draft
        .condition
        .parse()
        .map_err(|e: bazaar_types::TypeError| CatalogError::invalid("condition", e.to_string()))?;
    let category: Category = draft
        .category
        .parse()
        .map_err(|e: bazaar_types::TypeError| CatalogError::invalid("category", e.to_string()))?;
    let location = draft.location.trim();
    if location.is_empty() {
        return Err(CatalogError::invalid("location", "must not be empty"));
    }

    Ok(NewListing {
        title: title.to_string(),
        description: description.to_string(),
        price_cents,
        condition,
        category,
        location: location.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "Road bike".into(),
            description: "Aluminium frame, new tyres".into(),
            price: "350".into(),
            condition: "Good".into(),
            category: "Sports".into(),
            location: "Portland, OR".into(),
        }
    }

    fn invalid_field(result: CatalogResult<NewListing>) -> &'static str {
        match result {
            Err(CatalogError::Invalid { field, .. }) => field,
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn valid_draft_is_normalized() {
        let mut d = draft();
        d.title = "  Road bike  ".into();
        let listing = validate(&d).unwrap();
        assert_eq!(listing.title, "Road bike");
        assert_eq!(listing.price_cents, 35_000);
        assert_eq!(listing.condition, Condition::Good);
        assert_eq!(listing.category, Category::Sports);
    }

    #[test]
    fn short_title_is_rejected() {
        let mut d = draft();
        d.title = "Bike".into();
        assert_eq!(invalid_field(validate(&d)), "title");
    }

    #[test]
    fn short_description_is_rejected() {
        let mut d = draft();
        d.description = "Nice bike".into();
        assert_eq!(invalid_field(validate(&d)), "description");
    }

    #[test]
    fn unknown_condition_and_category_are_rejected() {
        let mut d = draft();
        d.condition = "Mint".into();
        assert_eq!(invalid_field(validate(&d)), "condition");

        let mut d = draft();
        d.category = "Groceries".into();
        assert_eq!(invalid_field(validate(&d)), "category");
    }

    #[test]
    fn blank_location_is_rejected() {
        let mut d = draft();
        d.location = "   ".into();
        assert_eq!(invalid_field(validate(&d)), "location");
    }

    #[test]
    fn prices() {
        assert_eq!(parse_price("899").unwrap(), 89_900);
        assert_eq!(parse_price("$18,500").unwrap(), 1_850_000);
        assert_eq!(parse_price("18.5").unwrap(), 1_850);
        assert_eq!(parse_price("0.99").unwrap(), 99);
        assert_eq!(parse_price(".5").unwrap(), 50);
        assert_eq!(parse_price("0").unwrap(), 0);

        for bad in ["", "abc", "-5", "1.234", "1.2.3", "$", ".", "12e3"] {
            assert!(parse_price(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(parse_price("999999999999999999999").is_err());
    }

    #[test]
    fn extension_prefers_file_name() {
        let img = ImageUpload::new("Sofa.JPG", "image/jpeg", vec![1u8]);
        assert_eq!(img.extension(), "jpg");
        let img = ImageUpload::new("photo", "image/png", vec![1u8]);
        assert_eq!(img.extension(), "png");
        let img = ImageUpload::new("photo", "image/jpeg", vec![1u8]);
        assert_eq!(img.extension(), "jpg");
        let img = ImageUpload::new("photo.tar/../x", "application/octet-stream", vec![1u8]);
        assert_eq!(img.extension(), "bin");
    }

    #[test]
    fn image_path_is_content_addressed() {
        let pid = ProductId::new("p1").unwrap();
        let a = ImageUpload::new("a.png", "image/png", vec![1u8, 2, 3]);
        let b = ImageUpload::new("b.png", "image/png", vec![1u8, 2, 3]);
        let c = ImageUpload::new("c.png", "image/png", vec![9u8]);

        let path = image_path(&pid, &a);
        assert!(path.starts_with("listings/p1/"));
        assert!(path.ends_with(".png"));
        assert_eq!(path.len(), "listings/p1/".len() + IMAGE_HASH_HEX_LEN + ".png".len());
        assert_eq!(path, image_path(&pid, &b));
        assert_ne!(path, image_path(&pid, &c));
    }

    #[test]
    fn non_images_are_rejected() {
        let ok = ImageUpload::new("a.png", "image/png", vec![1u8]);
        let text = ImageUpload::new("notes.txt", "text/plain", vec![1u8]);
        let empty = ImageUpload::new("a.png", "image/png", Vec::<u8>::new());
        assert!(check_images(&[ok.clone()]).is_ok());
        assert!(check_images(&[ok.clone(), text]).is_err());
        assert!(check_images(&[empty]).is_err());
    }

    proptest::proptest! {
        #[test]
        fn whole_dollar_prices_scale_by_100(dollars in 0u64..10_000_000) {
            proptest::prop_assert_eq!(parse_price(&dollars.to_string()).unwrap(), dollars * 100);
        }
    }
}
