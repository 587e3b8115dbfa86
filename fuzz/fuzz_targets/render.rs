#![no_main]

use herald_common::Variables;
use herald_registry::{Template, render};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // unit separator splits the input into a template and a variable value
    let mut parts = text.splitn(2, '\u{1f}');
    let body = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default();

    let variables = Variables::new().with("userName", value);
    let template = Template::new(body).with_subject(body);
    let _ = render(&template, &variables);
});
