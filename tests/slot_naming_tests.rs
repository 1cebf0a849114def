//! Integration tests for lazy attribute slots of same-named types

use propcache::{cached_props, AttrCache, CachedExt, PropCache};

mod metric {
    use propcache::{AttrCache, PropCache};

    #[derive(PropCache)]
    #[propcache(lazy)]
    pub struct Gauge {
        pub value: u32,
        pub cache: AttrCache,
    }
}

mod imperial {
    use propcache::{AttrCache, PropCache};

    #[derive(PropCache)]
    #[propcache(lazy)]
    pub struct Gauge {
        pub value: u32,
        pub cache: AttrCache,
    }
}

#[cached_props]
impl metric::Gauge {
    #[cached(0b01)]
    fn reading(&self) -> String {
        format!("{} mm", self.value)
    }
}

#[cached_props]
impl imperial::Gauge {
    #[cached(0b10)]
    fn reading(&self) -> String {
        format!("{} in", self.value)
    }
}

#[derive(PropCache)]
#[propcache(lazy)]
struct Wrapper<T> {
    inner: T,
    cache: AttrCache,
}

#[cached_props]
impl Wrapper<u32> {
    #[cached]
    fn describe(&self) -> String {
        format!("number {}", self.inner)
    }
}

#[cached_props]
impl Wrapper<String> {
    #[cached]
    fn describe(&self) -> String {
        format!("text {}", self.inner)
    }
}

#[test]
fn test_same_type_name_in_different_modules() {
    let metric = metric::Gauge {
        value: 3,
        cache: AttrCache::new(),
    };
    let imperial = imperial::Gauge {
        value: 3,
        cache: AttrCache::new(),
    };

    assert_eq!(metric.reading(), "3 mm");
    assert_eq!(imperial.reading(), "3 in");

    let metric_slot = metric::Gauge::reading_slot();
    let imperial_slot = imperial::Gauge::reading_slot();
    assert_ne!(metric_slot, imperial_slot);
    assert_eq!(metric_slot.flags(), 0b01);
    assert_eq!(imperial_slot.flags(), 0b10);
}

#[test]
fn test_generic_instantiations_keep_separate_slots() {
    let registry = PropCache::new();
    registry.register::<Wrapper<u32>>();
    registry.register::<Wrapper<String>>();

    let number = Wrapper {
        inner: 7_u32,
        cache: AttrCache::new(),
    };
    let text = Wrapper {
        inner: "seven".to_string(),
        cache: AttrCache::new(),
    };

    assert_eq!(number.describe(), "number 7");
    assert_eq!(text.describe(), "text seven");
    assert_ne!(
        Wrapper::<u32>::describe_slot(),
        Wrapper::<String>::describe_slot()
    );

    assert_eq!(number.purge_cached_in(&registry).unwrap(), 1);
    assert!(Wrapper::<String>::describe_slot().is_cached(&text));
}
