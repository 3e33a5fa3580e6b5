/// Half-open interval intersection: `[start_a, end_a)` meets `[start_b,
/// end_b)` iff `start_a < end_b && end_a > start_b`. Every overlap decision
/// in slot computation and conflict checking goes through this one predicate
/// so the boundary semantics cannot drift: a slot ending exactly when
/// another begins is not a conflict.
pub fn overlaps<T: PartialOrd>(start_a: T, end_a: T, start_b: T, end_b: T) -> bool {
    start_a < end_b && end_a > start_b
}
