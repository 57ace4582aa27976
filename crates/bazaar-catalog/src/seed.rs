//! The demo catalog loaded on first start.

use bazaar_types::{Category, Condition, Product, ProductId, Timestamp, UserId};
use chrono::{NaiveDate, TimeZone, Utc};

struct Demo {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    dollars: u64,
    category: Category,
    images: &'static [&'static str],
    seller: &'static str,
    location: &'static str,
    condition: Condition,
    listed: (i32, u32, u32),
    archived: bool,
}

const DEMO: &[Demo] = &[
    Demo {
        id: "1",
        title: "iPhone 14 Pro",
        description: "Barely used, perfect condition. Comes with original box and accessories.",
        dollars: 899,
        category: Category::Electronics,
        images: &[
            "https://images.unsplash.com/photo-1681567686392-dab7667d6642?q=80&w=2070",
            "https://images.unsplash.com/photo-1695575191499-69eb5a4710b2?q=80&w=2070",
        ],
        seller: "1",
        location: "San Francisco, CA",
        condition: Condition::LikeNew,
        listed: (2023, 6, 15),
        archived: false,
    },
    Demo {
        id: "2",
        title: "Modern Leather Sofa",
        description: "Beautiful brown leather sofa, only 1 year old. Moving and need to sell quickly.",
        dollars: 750,
        category: Category::Furniture,
        images: &["https://images.unsplash.com/photo-1540574163026-643ea20ade25?q=80&w=2070"],
        seller: "2",
        location: "Chicago, IL",
        condition: Condition::Good,
        listed: (2023, 5, 20),
        archived: false,
    },
    Demo {
        id: "3",
        title: "Sony Noise Cancelling Headphones",
        description: "WH-1000XM4 model, great sound quality with noise cancellation.",
        dollars: 199,
        category: Category::Electronics,
        images: &["https://images.unsplash.com/photo-1618366712010-f4ae9c647dcb?q=80&w=2788"],
        seller: "3",
        location: "Austin, TX",
        condition: Condition::Good,
        listed: (2023, 6, 1),
        archived: false,
    },
    Demo {
        id: "4",
        title: "Nike Air Jordan 1",
        description: "Size 10, worn only a few times. Original box included.",
        dollars: 180,
        category: Category::Fashion,
        images: &["https://images.unsplash.com/photo-1606107557195-0e29a4b5b4aa?q=80&w=1964"],
        seller: "1",
        location: "New York, NY",
        condition: Condition::LikeNew,
        listed: (2023, 5, 10),
        archived: false,
    },
    Demo {
        id: "5",
        title: "2019 Toyota Camry",
        description: "45,000 miles, excellent condition, one owner, all service records available.",
        dollars: 18_500,
        category: Category::Vehicles,
        images: &["https://images.unsplash.com/photo-1621007947382-bb3c3994e3fb?q=80&w=2069"],
        seller: "2",
        location: "Dallas, TX",
        condition: Condition::Good,
        listed: (2023, 6, 12),
        archived: false,
    },
    Demo {
        id: "6",
        title: "MacBook Pro 16\"",
        description: "M1 Max, 32GB RAM, 1TB SSD. Perfect for developers and designers.",
        dollars: 2_499,
        category: Category::Electronics,
        images: &["https://images.unsplash.com/photo-1611186871348-b1ce696e52c9?q=80&w=2070"],
        seller: "3",
        location: "Seattle, WA",
        condition: Condition::LikeNew,
        listed: (2023, 6, 5),
        archived: true,
    },
];

fn midnight_utc((y, m, d): (i32, u32, u32)) -> Option<Timestamp> {
    let naive = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// The six demo listings, in id order.
pub fn demo_products() -> Vec<Product> {
    DEMO.iter()
        .filter_map(|demo| {
            Some(Product {
                id: ProductId::new(demo.id).ok()?,
                title: demo.title.into(),
                description: demo.description.into(),
                price_cents: demo.dollars * 100,
                category: demo.category,
                images: demo.images.iter().map(|url| url.to_string()).collect(),
                seller_id: UserId::new(demo.seller).ok()?,
                location: demo.location.into(),
                condition: demo.condition,
                created_at: midnight_utc(demo.listed)?,
                is_archived: demo.archived,
            })
        })
        .collect()
}
