use lawmirror_gii::parser::{extract, parse_tree, to_value};

/// A law with `n` norms, shaped like the published markup.
fn synthetic_law(n: usize) -> Vec<u8> {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><dokumente builddate="20240101" doknr="BJNR000010000">"#,
    );
    xml.push_str("<norm><metadaten><jurabk>BENCHG</jurabk><langue>Gesetz zum Messen</langue></metadaten></norm>");
    for i in 0..n {
        xml.push_str(&format!(
            "<norm doknr=\"N{i}\"><metadaten><enbez>§ {i}</enbez><titel format=\"parat\">Titel {i}</titel></metadaten>\
             <textdaten><text format=\"XML\"><Content><P>(1) Satz eins von {i}.</P><P>(2) Satz zwei &amp; drei.</P></Content></text></textdaten></norm>"
        ));
    }
    xml.push_str("</dokumente>");
    xml.into_bytes()
}

#[divan::bench(args = [100, 1000])]
fn extract_law(bencher: divan::Bencher, norms: usize) {
    let xml = synthetic_law(norms);
    bencher.bench(|| extract(&xml).unwrap());
}

#[divan::bench(args = [1000])]
fn convert_tree(bencher: divan::Bencher, norms: usize) {
    let root = parse_tree(&synthetic_law(norms)).unwrap();
    bencher.bench(|| to_value(&root));
}

fn main() {
    divan::main();
}
