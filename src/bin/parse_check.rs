use mssql_spel::{PrinterConfig, parser::parse, render_with};

fn main() {
    println!(
        "sizeof(Expression) = {}",
        std::mem::size_of::<mssql_spel::ast::Expression>()
    );

    let config = PrinterConfig::default();
    for line in std::io::stdin().lines() {
        let line = line.expect("a line");
        let now = std::time::Instant::now();
        let res = parse(&line);
        print!("[in {}μs] ", now.elapsed().as_micros());
        match res {
            Err(e) => println!("Error parsing input: {e}"),
            Ok(tree) => println!("{tree}\n    => {}", render_with(&tree, &config)),
        }
    }
}
