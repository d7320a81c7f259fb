// Benchmark helpers; each bench file only uses some of them.

#[allow(dead_code)]
pub fn generate_library(modules: usize) -> String {
    let mut content = String::from("// LibFile: bench.scad\n//   Generated library.\n// FileGroup: Bench\n\n");
    for section in 0..modules.div_ceil(10) {
        content.push_str(&format!("// Section: Part {section}\n//   Parts numbered from {}.\n\n", section * 10));
        for n in section * 10..((section + 1) * 10).min(modules) {
            content.push_str(&generate_module(n));
        }
    }
    content
}

#[allow(dead_code)]
pub fn generate_module(n: usize) -> String {
    let see_also = if n > 0 {
        format!("// See Also: part{}()\n", n - 1)
    } else {
        String::new()
    };
    format!(
        "// Module: part{n}()\n\
         // Synopsis: Makes part number {n}.\n\
         // Topics: Parts, Group{}\n\
         {see_also}\
         // Usage:\n\
         //   part{n}(size);\n\
         // Description:\n\
         //   Builds part {n}. See {{{{part0()}}}} for the basics.\n\
         // Arguments:\n\
         //   size = Edge length.\n\
         //   ---\n\
         //   center = Centers the part.\n\
         // Example:\n\
         //   part{n}(10);\n\
         module part{n}(size, center=false) cube(size, center=center);\n\n",
        n % 7
    )
}
