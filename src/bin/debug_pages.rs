use lopdf::Document;
use pdf_to_pptx::{load_page, LayoutOptions};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_pages <pdf_path> [max_page | min-max]");
        std::process::exit(1);
    }

    let range = args.get(2).map(|s| s.as_str()).unwrap_or("1-3");
    let (min_page, max_page): (u32, u32) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(1), b.parse().unwrap_or(3))
    } else {
        (1, range.parse().unwrap_or(3))
    };

    let doc = match Document::load(&args[1]) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Failed to load {}: {}", args[1], e);
            std::process::exit(1);
        }
    };
    let layout = LayoutOptions::default();

    for (&page_num, &page_id) in doc.get_pages().range(min_page..=max_page) {
        let (page, error) = load_page(&doc, page_id, page_num, &layout);
        println!(
            "=== PAGE {} ({:.1} x {:.1} pt, {} drawings, {} images, {} blocks) ===",
            page_num,
            page.width,
            page.height,
            page.drawings.len(),
            page.images.len(),
            page.blocks.len()
        );
        if let Some(e) = error {
            println!("  content error: {}", e);
        }
        for d in &page.drawings {
            println!(
                "  path  x={:7.1} y={:7.1} w={:7.1} h={:7.1} items={} fill={:?}",
                d.rect.x0,
                d.rect.y0,
                d.rect.width(),
                d.rect.height(),
                d.items,
                d.fill
            );
        }
        for img in &page.images {
            for r in &img.placements {
                println!(
                    "  image /{} {:?} x={:7.1} y={:7.1} w={:7.1} h={:7.1}",
                    img.name,
                    img.id,
                    r.x0,
                    r.y0,
                    r.width(),
                    r.height()
                );
            }
        }
        for (i, block) in page.blocks.iter().enumerate() {
            println!(
                "  block {} x={:7.1} y={:7.1} w={:7.1} h={:7.1}",
                i,
                block.bbox.x0,
                block.bbox.y0,
                block.bbox.width(),
                block.bbox.height()
            );
            for line in &block.lines {
                for span in &line.spans {
                    println!(
                        "    x={:7.1} y={:7.1} fs={:5.1} font={} color={:?} text={:?}",
                        span.bbox.x0, span.bbox.y0, span.size, span.font, span.color, span.text
                    );
                }
            }
        }
        println!();
    }
}
