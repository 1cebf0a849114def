//! Integration tests for lazily computed attributes

use propcache::{
    cached_props, lazy_attribute, lazy_attribute_with_flags, AttrCache, HasAttrCache, LazyAttr,
    PropCache, TypeDecl, TypeKey,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(PropCache)]
#[propcache(lazy)]
struct Circle {
    radius: f64,
    area_calls: AtomicUsize,
    cache: AttrCache,
}

impl Circle {
    fn new(radius: f64) -> Self {
        Circle {
            radius,
            area_calls: AtomicUsize::new(0),
            cache: AttrCache::new(),
        }
    }
}

#[cached_props]
impl Circle {
    #[cached]
    fn area(&self) -> f64 {
        self.area_calls.fetch_add(1, Ordering::SeqCst);
        std::f64::consts::PI * self.radius * self.radius
    }

    #[cached]
    fn description(&self) -> String {
        format!("circle r={}", self.radius)
    }

    fn diameter(&self) -> f64 {
        self.radius * 2.0
    }
}

#[test]
fn test_computes_once_per_instance() {
    let circle = Circle::new(1.0);

    let first = circle.area();
    let second = circle.area();
    let third = circle.area();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(circle.area_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_instances_are_independent() {
    let small = Circle::new(1.0);
    let large = Circle::new(10.0);

    assert!(small.area() < large.area());
    assert_eq!(small.area_calls.load(Ordering::SeqCst), 1);
    assert_eq!(large.area_calls.load(Ordering::SeqCst), 1);

    // resetting one instance leaves the other untouched
    assert!(Circle::area_slot().reset(&small));
    assert!(Circle::area_slot().is_cached(&large));
}

#[test]
fn test_reset_recomputes() {
    let circle = Circle::new(2.0);
    circle.area();
    assert!(Circle::area_slot().is_cached(&circle));

    assert!(Circle::area_slot().reset(&circle));
    assert!(!Circle::area_slot().is_cached(&circle));

    circle.area();
    assert_eq!(circle.area_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reset_is_idempotent() {
    let circle = Circle::new(3.0);

    // never computed: nothing to remove
    assert!(!Circle::area_slot().reset(&circle));

    circle.area();
    assert!(Circle::area_slot().reset(&circle));
    assert!(!Circle::area_slot().reset(&circle));
    assert_eq!(circle.area_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_plain_methods_are_untouched() {
    let circle = Circle::new(1.5);

    assert_eq!(circle.diameter(), 3.0);
    assert!(circle.attr_cache().is_empty());

    assert_eq!(circle.description(), "circle r=1.5");
    assert_eq!(circle.attr_cache().names(), vec!["description"]);
}

#[test]
fn test_slot_accessor_is_stable() {
    let a = Circle::area_slot();
    let b = Circle::area_slot();

    assert_eq!(a, b);
    assert_ne!(a, Circle::description_slot());
    assert_eq!(a.name(), "area");
    assert_eq!(a.flags(), 0);
}

#[test]
fn test_shared_instance_across_threads() {
    let circle = Arc::new(Circle::new(4.0));
    let expected = std::f64::consts::PI * 16.0;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let circle = Arc::clone(&circle);
            thread::spawn(move || circle.area())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }

    // concurrent first reads may each compute, later reads never do
    let computed = circle.area_calls.load(Ordering::SeqCst);
    assert!((1..=8).contains(&computed));
    circle.area();
    assert_eq!(circle.area_calls.load(Ordering::SeqCst), computed);
}

struct Invoice {
    lines: Vec<u64>,
    cache: AttrCache,
}

impl HasAttrCache for Invoice {
    fn attr_cache(&self) -> &AttrCache {
        &self.cache
    }
}

fn total(invoice: &Invoice) -> u64 {
    invoice.lines.iter().sum()
}

const TAXES: u64 = 0b100;

#[test]
fn test_lazy_attribute_without_macros() {
    let total_attr = lazy_attribute(total);
    let tax_attr: LazyAttr<Invoice, u64> =
        lazy_attribute_with_flags(TAXES).named("tax", |invoice: &Invoice| {
            invoice.lines.iter().sum::<u64>() / 10
        });

    assert_eq!(total_attr.name(), "total");
    assert_eq!(total_attr.flags(), 0);
    assert_eq!(tax_attr.flags(), TAXES);

    let registry = PropCache::new();
    registry.register_decl(
        TypeKey::of::<Invoice>(),
        TypeDecl::new().lazy(&total_attr).lazy(&tax_attr),
    );

    let invoice = Invoice {
        lines: vec![100, 200, 300],
        cache: AttrCache::new(),
    };
    assert_eq!(total_attr.compute_or_fetch(&invoice), 600);
    assert_eq!(tax_attr.compute_or_fetch(&invoice), 60);

    // only the tax attribute carries the TAXES flag
    assert_eq!(registry.purge_by_flag(&invoice, TAXES).unwrap(), 1);
    assert!(total_attr.is_cached(&invoice));
    assert!(!tax_attr.is_cached(&invoice));
}

#[cfg(feature = "stats")]
#[test]
fn test_slot_statistics() {
    let hits = lazy_attribute_with_flags(0).named("hits", |cache: &AttrCache| cache.len());
    let cache = AttrCache::new();

    hits.compute_or_fetch(&cache);
    hits.compute_or_fetch(&cache);
    hits.compute_or_fetch(&cache);
    hits.reset(&cache);

    let stats = hits.slot().stats();
    assert_eq!(stats.computations(), 1);
    assert_eq!(stats.hits(), 2);
    assert_eq!(stats.resets(), 1);
}
