// Gather contract: sharded accumulation folded back into one table.
use statgather::api::{ErrorKind, GatherStats, Key, Report, Table, Value};

const SAMPLES: [&str; 6] = ["s1", "s2", "s3", "s4", "s5", "s6"];

fn empty() -> Table {
    let mut table = Table::new("CountReads", "reads per sample").expect("table");
    table.add_primary_key("sample").expect("pk");
    table.add_column("reads", 0).expect("reads");
    table.add_column("mean_quality", 0.0).expect("mean_quality");
    table
}

fn observe(table: &mut Table, sample: &str, quality: f64) {
    table.increment(sample, "reads").expect("increment");
    table.add(sample, "mean_quality", quality).expect("add");
}

#[test]
fn disjoint_shards_gather_to_the_single_pass_result() {
    let mut reference = empty();
    let mut shards = vec![empty(), empty(), empty()];
    for (idx, sample) in SAMPLES.iter().enumerate() {
        for rep in 0..=idx {
            let quality = 20.0 + rep as f64;
            observe(&mut reference, sample, quality);
            observe(&mut shards[idx % 3], sample, quality);
        }
    }

    // Each worker hands its shard over as text.
    let mut parsed: Vec<Table> = shards
        .iter()
        .map(|shard| Table::from_wire_str(&shard.to_wire_string().expect("render")).expect("parse"))
        .collect();
    let mut merged = parsed.remove(0);
    let mut stats = GatherStats::default();
    for shard in &parsed {
        stats.absorb(merged.combine_with(shard).expect("combine"));
    }

    assert_eq!(stats.cells_overwritten, 0);
    assert_eq!(merged.num_rows(), SAMPLES.len());
    assert!(merged == reference);
    assert_eq!(merged.get("s6", "reads").expect("s6"), Value::Integer(6));
}

#[test]
fn overlapping_keys_make_gather_order_dependent() {
    let mut a = empty();
    let mut b = empty();
    a.set("s1", "reads", 10).expect("a");
    b.set("s1", "reads", 99).expect("b");

    let mut ab = a.clone();
    ab.combine_with(&b).expect("a then b");
    let mut ba = b.clone();
    ba.combine_with(&a).expect("b then a");

    assert_eq!(ab.get("s1", "reads").expect("ab"), Value::Integer(99));
    assert_eq!(ba.get("s1", "reads").expect("ba"), Value::Integer(10));
    assert!(ab != ba);
}

#[test]
fn summing_overlapping_shards_uses_explicit_arithmetic() {
    let mut a = empty();
    let mut b = empty();
    a.set("s1", "reads", 10).expect("a");
    b.set("s1", "reads", 5).expect("b");
    b.set("s2", "reads", 1).expect("b");

    for key in b.primary_keys().cloned().collect::<Vec<Key>>() {
        let reads = b.lookup(&key, "reads").expect("lookup").clone();
        a.add(key, "reads", reads).expect("add");
    }
    assert_eq!(a.get("s1", "reads").expect("s1"), Value::Integer(15));
    assert_eq!(a.get("s2", "reads").expect("s2"), Value::Integer(1));
}

#[test]
fn report_gather_keeps_unshared_tables_and_rejects_drift() {
    let mut coverage = Table::new("Coverage", "").expect("table");
    coverage.add_primary_key("interval").expect("pk");
    coverage.add_column("depth", 0.0).expect("depth");
    coverage.set("chr1:100-200", "depth", 31.5).expect("set");

    let mut left = Report::new();
    left.add_table(empty()).expect("left");
    let mut right = Report::new();
    let mut counts = empty();
    counts.increment("s9", "reads").expect("increment");
    right.add_table(counts).expect("counts");
    right.add_table(coverage).expect("coverage");

    let stats = left.combine_with(&right).expect("combine");
    assert_eq!(stats.rows_added, 2);
    assert_eq!(left.len(), 2);
    assert!(left.table("Coverage").is_some());

    let mut drifted = empty();
    drifted
        .replace_column("mean_quality", 0.0, true, "%.2f")
        .expect("replace");
    let mut other = Report::new();
    other.add_table(drifted).expect("drifted");
    let err = left.combine_with(&other).expect_err("format drift");
    assert_eq!(err.kind(), ErrorKind::Mismatch);
}
