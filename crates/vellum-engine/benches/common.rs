// Shared by every bench target; each one uses a different subset.
#[allow(dead_code)]
pub fn generate_paragraphs(count: usize) -> String {
    (0..count)
        .map(|i| format!("<p>Paragraph {i} with <b>bold</b> and <i>italic</i> text.</p>"))
        .collect()
}

#[allow(dead_code)]
pub fn generate_nested_list(items: usize, depth: usize) -> String {
    let mut out = String::new();
    generate_list(items, depth, &mut out);
    out
}

#[allow(dead_code)]
fn generate_list(items: usize, depth: usize, out: &mut String) {
    out.push_str("<ul>");
    for i in 0..items {
        out.push_str(&format!("<li><p>item {i} at depth {depth}</p>"));
        if depth > 1 {
            generate_list(items, depth - 1, out);
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}
