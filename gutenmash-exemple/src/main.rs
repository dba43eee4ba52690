use gutenmash_core::model::generator::Generator;
use gutenmash_core::model::reference::{Seed, Window};
use gutenmash_core::text;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load all corpora from the "data" directory (.txt files), using a
    // window length of 2 tokens. A .bin cache is written next to each
    // corpus on first build and loaded automatically afterwards.
    let app: Generator = Generator::new("./data", 2)?;

    // See what was picked up
    for name in app.corpus_names() {
        println!("Loaded corpus: {}", name);
    }

    // The process-wide rng is fine here; pass a seeded StdRng instead if
    // reproducible output is wanted
    let mut rng = rand::rng();

    // Generate three sentences from a single book
    let prose = app.generate_text(&["huck_finn"], 3, &mut rng)?;
    println!("\nFrom one book:\n{}", prose);

    // Mash two books together and generate from the combined table.
    // Counts are summed where the books share windows; the originals are
    // left untouched.
    let mashed = app.mash(&["huck_finn", "critique_of_pure_reason"])?;
    let stream = mashed.generate(Seed::Random, 3, &mut rng)?;
    println!("\nFrom the mashup:\n{}", text::render(&stream));

    // Seeding at a chosen window steers where the walk starts. The window
    // must have the table's length, and must exist in the table or the
    // chain breaks immediately.
    let seed = Seed::Window(Window::from_tokens(&["the", "river"]));
    match mashed.generate(seed, 1, &mut rng) {
        Ok(stream) => println!("\nSeeded:\n{}", text::render(&stream)),
        Err(e) => println!("\nSeeded walk failed: {}", e),
    }

    Ok(())
}
