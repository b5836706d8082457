use std::cell::Cell;

use model_viewer::resources::texture::{
    ChannelHint, TextureCache, decode_image, mip_level_count,
};

#[test]
fn the_same_key_yields_the_same_handle_and_loads_once() {
    let mut cache = TextureCache::new("fallback");
    let loads = Cell::new(0);
    let load = || {
        loads.set(loads.get() + 1);
        Ok("wood")
    };

    let first = cache.get_or_insert_with("textures/wood.png", load);
    let second = cache.get_or_insert_with("textures/wood.png", load);
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(loads.get(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(*cache.resolve(first), "wood");
}

#[test]
fn different_keys_get_different_handles() {
    let mut cache = TextureCache::new("fallback");
    let a = cache.get_or_insert_with("a.png", || Ok("a"));
    let b = cache.get_or_insert_with("b.png", || Ok("b"));
    assert_ne!(a, b);
    assert_eq!(*cache.resolve(a), "a");
    assert_eq!(*cache.resolve(b), "b");
}

#[test]
fn failures_are_cached_too() {
    let mut cache: TextureCache<&str> = TextureCache::new("fallback");
    let attempts = Cell::new(0);
    let load = || {
        attempts.set(attempts.get() + 1);
        anyhow::bail!("not an image")
    };

    assert_eq!(cache.get_or_insert_with("broken.png", load), None);
    assert_eq!(cache.get_or_insert_with("broken.png", load), None);
    assert_eq!(attempts.get(), 1);
    assert!(cache.contains_key("broken.png"));
    assert!(cache.is_empty());
}

#[test]
fn empty_slots_resolve_to_the_fallback() {
    let cache: TextureCache<&str> = TextureCache::new("fallback");
    assert_eq!(*cache.resolve(None), "fallback");
    assert_eq!(*cache.fallback(), "fallback");
}

#[test]
fn decoded_images_carry_a_full_mip_chain() {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        16,
        4,
        image::Rgba([10, 20, 30, 40]),
    ));
    let decoded = decode_image(img, ChannelHint::Rgba);
    assert_eq!(decoded.levels.len() as u32, mip_level_count(16, 4));
    assert_eq!(decoded.levels.len(), 5);
    assert_eq!(decoded.channels, 4);
    assert!(decoded.srgb);
    assert_eq!(decoded.levels[0].get_pixel(0, 0).0, [10, 20, 30, 40]);
    let last = decoded.levels.last().unwrap();
    assert_eq!(last.dimensions(), (1, 1));
}
