//! Generates the bindings for `geo.yaml` into `OUT_DIR`.

use ridl_codegen::GenOptions;
use ridl_schema::Schema;
use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=geo.yaml");

    let schema = Schema::from_file("geo.yaml").expect("geo.yaml is a valid schema");
    let options = GenOptions {
        module: Some("geo".to_string()),
        skeletons: false,
        inner_attributes: false,
    };
    let files = ridl_codegen::generate(&schema, &options).expect("bindings generate");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    ridl_codegen::write_files(&out_dir, &files).expect("bindings are written");
}
