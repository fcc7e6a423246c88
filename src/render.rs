//! HTML rendering of a built gallery.
//!
//! [`render`] serializes a [`GalleryDocument`] into one static page: a title,
//! a total-count line, and a two-column table (`Car`, `Image`) with one row
//! per entry. Images are `data:` URIs, so the page has no external
//! references and can be published as a single blob.
//!
//! Rendering is pure: no clock, no randomness, no I/O. The same document
//! always renders to the same bytes, which makes re-publishing idempotent.
//!
//! Uses [maud](https://maud.lambda.xyz/) like the rest of the site output;
//! every interpolated value is escaped, so record attributes cannot inject
//! markup.

use crate::gallery::{GalleryDocument, GalleryEntry, MediaCell};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../static/style.css");

pub fn render(document: &GalleryDocument) -> String {
    render_page(document).into_string()
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

fn render_page(document: &GalleryDocument) -> Markup {
    let layout = document.layout();
    let content = html! {
        h1 { (layout.title) }
        p.total { (layout.count_label) ": " (document.total()) }
        table.inventory {
            tr {
                th { "Car" }
                th { "Image" }
            }
            @for entry in document.entries() {
                (render_entry(entry, layout.image_width))
            }
        }
    };
    base_document(&layout.title, content)
}

/// Row id unique across partitions; row keys alone may repeat.
fn row_id(entry: &GalleryEntry) -> String {
    format!("{}-{}", entry.partition_key, entry.row_key)
}

fn render_entry(entry: &GalleryEntry, image_width: u32) -> Markup {
    let alt = entry
        .caption
        .first()
        .filter(|line| !line.is_empty())
        .unwrap_or(&entry.row_key);

    html! {
        tr id=(row_id(entry)) {
            td.car {
                @for (i, line) in entry.caption.iter().enumerate() {
                    @if i > 0 {
                        br;
                    }
                    (line)
                }
            }
            @match &entry.media {
                MediaCell::Inline(image) => {
                    td.media {
                        img src=(image.data_uri()) alt=(alt) width=(image_width);
                    }
                },
                // Both degrade to an empty cell; the fault is reported by the CLI.
                MediaCell::Empty => {
                    td.media.empty {}
                },
                MediaCell::Unavailable(_) => {
                    td.media.unavailable {}
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{BuildOptions, build};
    use crate::store::{BlobStore, StoreError};
    use crate::test_helpers::*;
    use crate::types::ItemRecord;

    fn build_with_blobs(records: &[ItemRecord]) -> GalleryDocument {
        let blobs = seeded_blobs(records);
        build(records, |c, n| blobs.get(c, n), &test_options())
    }

    #[test]
    fn page_structure() {
        let html = render(&build_with_blobs(&sample_records(2)));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Alice's Car Dealership</title>"));
        assert!(html.contains("<h1>Alice's Car Dealership</h1>"));
        assert!(html.contains("Total cars in inventory: 2"));
        assert!(html.contains("<th>Car</th><th>Image</th>"));
    }

    #[test]
    fn rows_follow_entry_order() {
        let records = vec![
            car("SUV", "CAR009", "Ford", "Explorer", 1),
            car("Sedan", "CAR001", "Honda", "Civic", 2),
        ];
        let html = render(&build(&records, |_, _| unreachable!(), &test_options()));
        let first = html.find(r#"id="SUV-CAR009""#).unwrap();
        let second = html.find(r#"id="Sedan-CAR001""#).unwrap();
        assert!(first < second);
    }

    #[test]
    fn row_ids_are_unique_across_partitions() {
        let records = vec![
            car("SUV", "CAR001", "Ford", "Explorer", 1),
            car("Sedan", "CAR001", "Honda", "Civic", 2),
        ];
        let html = render(&build(&records, |_, _| unreachable!(), &test_options()));
        assert_eq!(html.matches(r#"id="SUV-CAR001""#).count(), 1);
        assert_eq!(html.matches(r#"id="Sedan-CAR001""#).count(), 1);
        assert!(!html.contains(r#"id="CAR001""#));
    }

    #[test]
    fn caption_lines_and_inline_image() {
        let records = sample_records(1);
        let html = render(&build_with_blobs(&records));
        assert!(html.contains("Toyota Corolla<br>Price: $15000"));
        assert!(html.contains(r#"src="data:image/png;base64,"#));
        assert!(html.contains(r#"width="300""#));
        assert!(html.contains(r#"alt="Toyota Corolla""#));
    }

    #[test]
    fn empty_and_unavailable_media_cells() {
        let records = vec![
            car("SUV", "CAR001", "Ford", "Focus", 1),
            car("SUV", "CAR002", "Ford", "Focus", 1).with_content_ref("no-separator"),
        ];
        let html = render(&build(&records, |_, _| unreachable!(), &test_options()));
        assert!(html.contains(r#"<td class="media empty"></td>"#));
        assert!(html.contains(r#"<td class="media unavailable"></td>"#));
        assert!(!html.contains("<img"));
        assert!(!html.contains("unavailable</td>"));
    }

    #[test]
    fn empty_document_renders_header_only_table() {
        let html = render(&build(&[], |_, _| unreachable!(), &test_options()));
        assert!(html.contains("Total cars in inventory: 0"));
        assert!(html.contains(
            r#"<table class="inventory"><tr><th>Car</th><th>Image</th></tr></table>"#
        ));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut records = sample_records(5);
        records[2].content_ref = Some("alicecardealer/missing.png".to_string());
        let blobs = seeded_blobs(&sample_records(5));
        let fetch = |c: &str, n: &str| -> Result<Vec<u8>, StoreError> {
            if n == "missing.png" {
                blobs.get(c, "nope.png")
            } else {
                blobs.get(c, n)
            }
        };
        let options = BuildOptions {
            max_workers: 3,
            ..test_options()
        };
        let first = render(&build(&records, fetch, &options));
        let second = render(&build(&records, fetch, &options));
        assert_eq!(first, second);
    }

    #[test]
    fn record_text_is_escaped() {
        let records = vec![car("SUV", "CAR001", "<script>alert('x')</script>", "X", 1)];
        let html = render(&build(&records, |_, _| unreachable!(), &test_options()));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
