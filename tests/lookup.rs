use gtexquery::lookup::{LookupTable, resolve};

fn table() -> LookupTable {
    LookupTable::from_pairs([("ASCL1", "ENSG00000139352.3"), ("DLX1", "ENSG00000144355.14")])
}

#[test]
fn resolves_known_symbol() {
    assert_eq!(resolve("ASCL1", &table()), "ENSG00000139352.3");
}

#[test]
fn unknown_symbol_is_returned_unchanged() {
    assert_eq!(resolve("NotAGene", &table()), "NotAGene");
}

#[test]
fn loads_from_csv() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("gencode.csv");
    std::fs::write(&path, "name,id\nabc,a1\ndef,a2\nabc,a3\n").unwrap();

    let table = LookupTable::from_csv_path(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(resolve("abc", &table), "a1");
    assert_eq!(resolve("ghi", &table), "ghi");
}
