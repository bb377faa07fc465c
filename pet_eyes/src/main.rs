// Prints the built-in vision catalog and what each profile does to a few
// reference colors. Frame processing lives in `pet_eyes_tester`.

use pet_eyes::pipeline::{ColorSample, Registry};

const SWATCHES: [(&str, [u8; 3]); 4] = [
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("orange", [255, 140, 0]),
];

fn main() {
    println!("PetEyes Vision Engine - Profile Catalog");
    for profile in Registry::global().list_profiles() {
        println!();
        println!("{} {} ({}): {}", profile.icon, profile.name, profile.id, profile.description);
        for (label, rgb) in SWATCHES {
            let [r, g, b] = profile.transform(ColorSample::from(rgb)).to_channels();
            println!("  {label:>6} {rgb:?} -> [{r}, {g}, {b}]");
        }
    }
}
