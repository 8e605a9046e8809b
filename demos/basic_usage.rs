//! Basic usage example for stratacfg.
//!
//! Layers defaults, an INI file, the environment and command line flags,
//! then changes a value and writes it back to the file.

use stratacfg::{
    CommandlineSource, ConfigValue, Defaults, EnvironmentSource, FileSource, LayeredConfig,
    ValueKind,
};
use std::fs;

const MYAPP_INI: &str = "
[__root__]
datadir = /var/lib/myapp
processes = 2

[mymodule]
loglevel = DEBUG
lastrun = 2012-09-18 15:41:00
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("stratacfg - Basic Usage Example");
    println!("===============================");

    let path = std::env::temp_dir().join("stratacfg-basic-usage.ini");
    fs::write(&path, MYAPP_INI)?;

    // Defaults give fallback values and declare the type of each key
    let defaults = Defaults::new()
        .value("datadir", "mydata")
        .value("processes", 1i64)
        .value("force", false)
        .value("jsfiles", vec!["default.js"])
        .section(
            "mymodule",
            Defaults::new()
                .value("loglevel", "INFO")
                .declare("lastrun", ValueKind::DateTime),
        );

    let config = LayeredConfig::builder()
        .source(defaults)
        .source(FileSource::open(&path)?)
        .source(EnvironmentSource::new(Some("MYAPP")))
        .source(CommandlineSource::new([
            "--force",
            "--jsfiles=pdfviewer.js",
            "--jsfiles=zepto.js",
        ]))
        .build();

    println!("\n=== Root section ===");
    for key in config.keys() {
        println!("  {key} = {}", config.get(&key)?);
    }
    // The file holds the text "2"; the integer default makes it an integer
    if let Ok(ConfigValue::Integer(processes)) = config.get("processes") {
        println!("  processes is an integer: {processes}");
    }

    let module = config.section("mymodule")?;
    println!("\n=== [mymodule] ===");
    println!("  loglevel = {:?}", module.get_string("loglevel")?);
    println!("  lastrun  = {:?}", module.get_datetime("lastrun")?);

    module.set("loglevel", "ERROR")?;
    module.write()?;
    println!("\n✓ Wrote {}:", path.display());
    print!("{}", fs::read_to_string(&path)?);

    fs::remove_file(&path)?;
    Ok(())
}
