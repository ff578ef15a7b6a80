//! Flavor text shown after a batch completes

use rand::rng;
use rand::seq::IndexedRandom;

const WHALE_FACTS: &[&str] = &[
    "Blue whales are the largest animals known to have ever lived",
    "A blue whale's heart is roughly the size of a small car",
    "Humpback whale songs can travel thousands of kilometres underwater",
    "Sperm whales sleep vertically, drifting just below the surface",
    "Bowhead whales can live for more than 200 years",
    "Narwhal tusks are teeth, and some narwhals grow two",
    "Orcas are the largest members of the dolphin family",
    "Gray whales migrate up to 20,000 km every year",
    "Whales evolved from land mammals around 50 million years ago",
    "Beluga whales can turn their heads because their neck vertebrae are not fused",
    "Sperm whales have the largest brain of any animal",
    "Baleen is made of keratin, the same protein as your fingernails",
];

/// A random whale fact
pub fn random_fact() -> Option<&'static str> {
    WHALE_FACTS.choose(&mut rng()).copied()
}
