use wavesel_core::RegClass;

use super::DecompositionCache;
use crate::{Options, Program};

#[test]
fn keeps_complete_breakdowns() {
    let mut program = Program::new(&Options::default());
    let vec = program.allocate_tmp(RegClass::V4);
    let parts = [RegClass::V2, RegClass::V1, RegClass::V1].map(|rc| program.allocate_tmp(rc));

    let mut cache = DecompositionCache::new();
    assert!(cache.insert(vec, &parts));
    assert_eq!(cache.get(vec), Some(&parts[..]));
    assert_eq!(cache.len(), 1);

    cache.invalidate(vec.id());
    assert_eq!(cache.get(vec), None);
    assert!(cache.is_empty());
}

#[test]
fn rejects_size_mismatch() {
    let mut program = Program::new(&Options::default());
    let vec = program.allocate_tmp(RegClass::V3);
    let short = [RegClass::V1, RegClass::V1].map(|rc| program.allocate_tmp(rc));
    let long = [RegClass::V2, RegClass::V2].map(|rc| program.allocate_tmp(rc));

    let mut cache = DecompositionCache::new();
    assert!(!cache.insert(vec, &short));
    assert!(!cache.insert(vec, &long));
    assert!(!cache.insert(vec, &[]));
    assert_eq!(cache.get(vec), None);
}

#[test]
fn subdword_parts() {
    let mut program = Program::new(&Options::default());
    let vec = program.allocate_tmp(RegClass::V6B);
    let parts = [RegClass::V2B; 3].map(|rc| program.allocate_tmp(rc));

    let mut cache = DecompositionCache::new();
    assert!(cache.insert(vec, &parts));
    assert_eq!(cache.get(vec).map(<[_]>::len), Some(3));
}
