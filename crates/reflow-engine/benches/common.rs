// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "Paragraph with some content that is long enough to wrap at least once when the width is small.\n\n> A quoted paragraph.\n> > With a deeper quote inside it.\n> Back to the first level.\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

/// Byte offset of the middle paragraph's first word, for edits that land
/// well inside the document.
#[allow(dead_code)]
pub fn middle_paragraph(content: &str) -> usize {
    let half = content.len() / 2;
    content[half..]
        .find("\n\nParagraph")
        .map_or(half, |offset| half + offset + 2)
}
