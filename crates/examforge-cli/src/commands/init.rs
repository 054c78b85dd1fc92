//! The `examforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create examforge.toml
    if std::path::Path::new("examforge.toml").exists() {
        println!("examforge.toml already exists, skipping.");
    } else {
        std::fs::write("examforge.toml", SAMPLE_CONFIG)?;
        println!("Created examforge.toml");
    }

    std::fs::create_dir_all("questions")?;
    let bank_path = std::path::Path::new("questions/biology.toml");
    if bank_path.exists() {
        println!("questions/biology.toml already exists, skipping.");
    } else {
        std::fs::write(bank_path, EXAMPLE_BANK)?;
        println!("Created questions/biology.toml");
    }

    std::fs::create_dir_all("requests")?;
    for (name, content) in [
        ("requests/automatic.toml", EXAMPLE_AUTOMATIC),
        ("requests/manual.toml", EXAMPLE_MANUAL),
    ] {
        let path = std::path::Path::new(name);
        if path.exists() {
            println!("{name} already exists, skipping.");
        } else {
            std::fs::write(path, content)?;
            println!("Created {name}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Add questions under questions/");
    println!("  2. Run: examforge plan --request requests/automatic.toml");
    println!("  3. Run: examforge generate --request requests/automatic.toml --commit");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examforge configuration

question_bank = "questions"
data_dir = ".examforge"
# default_author = "${USER}"
max_question_count = 200
proportion_decimals = 4
page_size = 20
"#;

const EXAMPLE_BANK: &str = r#"[bank]
subject = "biology"

[[questions]]
id = "bio-001"
difficulty = "easy"
type = "mcq"
topic = "cells"
body = "Which organelle produces most of the cell's ATP?"
options = ["Nucleus", "Mitochondrion", "Ribosome", "Golgi apparatus"]
response = "Mitochondrion"

[[questions]]
id = "bio-002"
difficulty = "easy"
type = "mcq"
topic = "cells"
body = "Which structure controls what enters and leaves the cell?"
options = ["Cell membrane", "Cell wall", "Cytoplasm", "Vacuole"]
response = "Cell membrane"

[[questions]]
id = "bio-003"
difficulty = "medium"
type = "mcq"
topic = "genetics"
sub_topic = "inheritance"
body = "Two heterozygous parents (Aa x Aa) have a child. What is the chance it is aa?"
options = ["0%", "25%", "50%", "75%"]
response = "25%"

[[questions]]
id = "bio-004"
difficulty = "medium"
type = "mcq"
topic = "ecology"
body = "What is the primary source of energy for most ecosystems?"
options = ["The sun", "Decomposers", "Soil minerals", "Water"]
response = "The sun"

[[questions]]
id = "bio-005"
difficulty = "medium"
type = "essay"
topic = "genetics"
body = "Explain the difference between mitosis and meiosis."

[[questions]]
id = "bio-006"
difficulty = "hard"
type = "essay"
topic = "ecology"
body = "Describe how a keystone species shapes its ecosystem, with one example."
"#;

const EXAMPLE_AUTOMATIC: &str = r#"[exam]
title = "Biology checkpoint"
subject = "biology"
author = "instructor"

[[question_types]]
id = "mcq"
count = 3

[[question_types]]
id = "essay"
count = 1

[difficulties]
easy = 2
medium = 2
"#;

const EXAMPLE_MANUAL: &str = r#"[exam]
title = "Cells and genetics"
subject = "biology"
author = "instructor"

[[questions]]
id = "bio-001"

[[questions]]
id = "bio-003"

[[questions]]
id = "bio-005"
"#;
