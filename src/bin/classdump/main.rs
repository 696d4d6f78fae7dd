use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use classlib::{
    Archive, ClassFile,
    class::{AttributeInfo, FieldInfo, MethodInfo},
};
use log::LevelFilter;

/// Prints the structure of class files, either standalone or inside a jar.
#[derive(Debug, Parser)]
struct Cli {
    /// Be verbose.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// A `.class` file, or a jar/zip archive.
    file: PathBuf,

    /// Classes to dump from the archive; lists all classes when empty.
    classes: Vec<String>,
}

fn setup_logger(verbose: bool) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
        })
        .level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .chain(std::io::stderr())
        .apply()
        .context("failed to install logger")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;

    if cli.file.extension().is_some_and(|ext| ext == "class") {
        let bytes = fs::read(&cli.file).with_context(|| format!("failed to read {:?}", cli.file))?;
        let class = ClassFile::parse(&bytes).with_context(|| format!("in {:?}", cli.file))?;
        dump_class(&class);
        return Ok(());
    }

    let archive = Archive::open_path(&cli.file)?;
    if cli.classes.is_empty() {
        for name in archive.class_names() {
            println!("{name}");
        }
        return Ok(());
    }

    for name in &cli.classes {
        match archive.try_load_class(name)? {
            Some(class) => dump_class(&class),
            None => bail!("class {name} not found in {}", archive.label()),
        }
    }
    Ok(())
}

fn dump_class(class: &ClassFile) {
    println!(
        "class {} (version {}.{}, flags {:?})",
        class.name(),
        class.major_version(),
        class.minor_version(),
        class.access_flags()
    );
    if let Some(super_class) = class.super_class() {
        println!("  extends {super_class}");
    }
    for interface in class.interfaces() {
        println!("  implements {interface}");
    }
    if let Some(source_file) = class.source_file() {
        println!("  source {source_file}");
    }
    for field in class.fields() {
        dump_field(field);
    }
    for method in class.methods() {
        dump_method(method);
    }
    dump_attributes("  ", class.attributes());
}

fn dump_field(field: &FieldInfo) {
    println!(
        "  field {} {} {:?}",
        field.name(),
        field.descriptor(),
        field.access_flags()
    );
    if let Some(value) = field.constant_value() {
        println!("    = {value:?}");
    }
}

fn dump_method(method: &MethodInfo) {
    println!(
        "  method {}{} {:?}",
        method.name(),
        method.descriptor(),
        method.access_flags()
    );
    if let Some(code) = method.code() {
        println!(
            "    code: {} bytes, max_stack {}, max_locals {}, {} handler(s)",
            code.code.len(),
            code.max_stack,
            code.max_locals,
            code.exception_table.len()
        );
    }
    for exception in method.exceptions() {
        println!("    throws {exception}");
    }
}

fn dump_attributes(indent: &str, attributes: &[AttributeInfo]) {
    for attribute in attributes {
        match attribute {
            AttributeInfo::Unknown { name, info } => {
                println!("{indent}attribute {name} ({} bytes)", info.len())
            }
            other => println!("{indent}attribute {}", other.name()),
        }
    }
}
