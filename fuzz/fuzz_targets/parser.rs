#![no_main]

use beditor::MarkupParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let doc = MarkupParser::parse(&input, &[]);
    let markup = doc.to_markup();
    let again = MarkupParser::parse(&markup, &[]).to_markup();
    assert_eq!(markup, again);
});
