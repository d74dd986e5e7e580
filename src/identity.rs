//! Anonymous display-name generation.
//!
//! Names are a modifier word, a noun from the tag-appropriate pool, and a
//! number in 1..=999. There is no uniqueness guarantee across sessions;
//! collisions are cosmetic and accepted.

use crate::state::session::Tag;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Happy", "Clever", "Bright", "Swift", "Kind", "Brave", "Calm", "Cool", "Wise", "Bold",
    "Gentle", "Quick", "Smart", "Funny", "Lucky", "Sunny", "Witty", "Zesty", "Eager", "Noble",
];

const ANIMALS: &[&str] = &[
    "Bee", "Fox", "Cat", "Dog", "Bear", "Bird", "Fish", "Lion", "Wolf", "Deer", "Owl", "Frog",
    "Duck", "Seal", "Hawk", "Dove", "Swan", "Crab", "Moth", "Wren",
];

const BLOSSOMS: &[&str] = &[
    "Rose", "Lily", "Iris", "Fern", "Ivy", "Sage", "Aster", "Daisy", "Poppy", "Tulip", "Clover",
    "Lotus", "Violet", "Maple", "Willow", "Heather", "Jasmine", "Dahlia", "Marigold", "Zinnia",
];

/// Generate a fresh anonymous display name.
///
/// Pure and infallible; the tag only selects the noun pool. Sessions with
/// no tag draw from the neutral (animal) pool.
pub fn generate_name(tag: Option<Tag>) -> String {
    let mut rng = rand::thread_rng();
    let nouns = noun_pool(tag);
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = nouns[rng.gen_range(0..nouns.len())];
    let number: u16 = rng.gen_range(1..=999);
    format!("{adjective}{noun}{number}")
}

fn noun_pool(tag: Option<Tag>) -> &'static [&'static str] {
    match tag {
        Some(Tag::Blossom) => BLOSSOMS,
        Some(Tag::Animal) | None => ANIMALS,
    }
}
