//! CLI tool for PDF to PowerPoint conversion

use pdf_to_pptx::convert_pdf_to_pptx;
use std::env;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file> [output_file] [--json]", args[0]);
        eprintln!();
        eprintln!("Converts each PDF page into one slide of rectangles, pictures and text boxes.");
        eprintln!("The output defaults to the input path with a .pptx extension.");
        process::exit(1);
    }

    let pdf_path = &args[1];
    let json_output = args[2..].iter().any(|a| a == "--json");
    let output = args[2..]
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| {
            Path::new(pdf_path)
                .with_extension("pptx")
                .to_string_lossy()
                .to_string()
        });

    match convert_pdf_to_pptx(pdf_path, &output) {
        Ok(report) => {
            if json_output {
                match serde_json::to_string(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                }
                return;
            }

            println!("PDF to PPTX Conversion");
            println!("======================");
            println!("File: {}", pdf_path);
            println!("Output: {}", output);
            println!("Slides: {}", report.slide_count());
            println!(
                "Canvas: {} x {} EMU",
                report.canvas.width, report.canvas.height
            );

            let mismatched = report.mismatched_pages();
            if !mismatched.is_empty() {
                println!("Pages with a different size than the canvas: {:?}", mismatched);
            }

            if report.skipped_count() > 0 {
                println!();
                println!("Skipped elements: {}", report.skipped_count());
                for page in &report.pages {
                    for skipped in &page.skipped {
                        println!("  page {}: {:?}: {}", page.page, skipped.element, skipped.reason);
                    }
                }
            }
        }
        Err(e) => {
            if json_output {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("Error: {}", e);
            }
            process::exit(1);
        }
    }
}
