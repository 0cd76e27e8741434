use glimpse::{ALTERNATE_EXTENSION, resolve};
use glimpse_core::{DEFAULT_DENSITY_TIERS, DensityTiers, ResourceDescriptor};
use rstest::rstest;

fn descriptor(uri: &str, tiers: &[u32]) -> ResourceDescriptor {
    ResourceDescriptor::new(uri).with_density_tiers(DensityTiers::new(tiers.iter().copied()).unwrap())
}

#[test]
fn jpeg_with_two_tiers() {
    let sources = resolve(&descriptor("photo.jpg", &[400, 800]), true);
    assert_eq!(sources.primary_src, "photo.webp");
    assert_eq!(
        sources.src_set_primary.to_string(),
        "photo_400w.jpg 400w, photo_800w.jpg 800w"
    );
    assert_eq!(
        sources.src_set_alternate.unwrap().to_string(),
        "photo_400w.webp 400w, photo_800w.webp 800w"
    );
}

#[rstest]
#[case::empty(&[])]
#[case::single(&[640])]
#[case::unsorted(&[1600, 400, 1200, 800])]
#[case::duplicates(&[800, 400, 800])]
#[case::wide(&[320, 480, 640, 960, 1280, 1920, 2560])]
fn one_entry_per_tier_ascending(#[case] tiers: &[u32]) {
    let desc = descriptor("gallery/cover.png", tiers);
    let expected = desc.density_tiers().len();
    let sources = resolve(&desc, true);

    for set in [&sources.src_set_primary, sources.src_set_alternate.as_ref().unwrap()] {
        assert_eq!(set.len(), expected);
        let widths: Vec<u32> = set.iter().map(|e| e.width).collect();
        assert!(widths.windows(2).all(|w| w[0] < w[1]), "{widths:?}");
    }
}

#[test]
fn default_tiers_apply_without_override() {
    let sources = resolve(&ResourceDescriptor::new("hero.jpg"), false);
    let widths: Vec<u32> = sources.src_set_primary.iter().map(|e| e.width).collect();
    assert_eq!(widths, DEFAULT_DENSITY_TIERS);
    assert!(sources.src_set_alternate.is_none());
    assert_eq!(sources.primary_src, "hero.jpg");
}

#[rstest]
#[case("photo.jpg")]
#[case("https://cdn.test/a/b.jpeg?v=2")]
#[case("icon.svg")]
#[case("noext")]
fn alternate_entries_use_alternate_extension(#[case] uri: &str) {
    let sources = resolve(&descriptor(uri, &[400]), true);
    let alternate = sources.src_set_alternate.unwrap();
    let entry = &alternate.entries()[0];
    assert!(entry.uri.contains(&format!("_400w.{ALTERNATE_EXTENSION}")), "{}", entry.uri);
}
