use super::{ImageEmbed, IndexPage, Target};

/// Plain wiki markdown with fenced, line-numbered code.
#[derive(Debug, Clone, Copy, Default)]
pub struct WikiTarget;

impl Target for WikiTarget {
    fn name(&self) -> &str {
        "wiki"
    }
}

/// GitHub wiki pages: left-floated HTML images with indented code beside them.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubWikiTarget;

impl Target for GitHubWikiTarget {
    fn name(&self) -> &str {
        "githubwiki"
    }

    fn image(&self, embed: &ImageEmbed<'_>, rel_url: &str) -> Vec<String> {
        let alt = format!("{} {}", embed.item, embed.title);
        let alt = html_escape::encode_double_quoted_attribute(&alt);
        let size = match (embed.width, embed.height) {
            (Some(w), Some(h)) => format!(" width=\"{w}\" height=\"{h}\""),
            (Some(w), None) => format!(" width=\"{w}\""),
            _ => String::new(),
        };
        vec![
            format!("<img align=\"left\" alt=\"{alt}\" src=\"{rel_url}\"{size}>"),
            String::new(),
        ]
    }

    fn code_block(&self, code: &[String]) -> Vec<String> {
        let mut out = self.indent_lines(code);
        out.push(String::new());
        out
    }

    fn image_block(&self, embed: &ImageEmbed<'_>) -> Vec<String> {
        let mut out = self.block_header(embed.title, embed.subtitle, false);
        if let Some(url) = embed.rel_url {
            out.extend(self.image(embed, url));
        }
        if embed.code_below {
            out.extend(self.markdown_block(&[r#"<br clear="all" />"#.to_string()]));
        }
        out.extend(self.code_block(embed.code));
        if !embed.code_below {
            out.extend(self.markdown_block(&[r#"<br clear="all" /><br/>"#.to_string()]));
        }
        out
    }
}

/// MkDocs sites: links carry the `.md` suffix and index pages are lowercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct MkDocsTarget;

impl Target for MkDocsTarget {
    fn name(&self) -> &str {
        "mkdocs"
    }

    fn page_link(&self, page: IndexPage) -> String {
        match page {
            IndexPage::Toc => "index",
            IndexPage::Topics => "topics",
            IndexPage::AlphaIndex => "alphaindex",
            IndexPage::CheatSheet => "cheatsheet",
            IndexPage::Sidebar => "_sidebar",
        }
        .to_string()
    }

    fn get_link(&self, label: &str, anchor: &str, file: &str, literalize: bool) -> String {
        let label = if literalize {
            format!("`{label}`")
        } else {
            self.escape_entities(label)
        };
        let file = if file.is_empty() {
            String::new()
        } else {
            format!("{file}{}", self.suffix())
        };
        let anchor = if anchor.is_empty() {
            String::new()
        } else {
            format!("#{anchor}")
        };
        format!("[{label}]({file}{anchor})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn embed<'a>(code: &'a [String], code_below: bool) -> ImageEmbed<'a> {
        ImageEmbed {
            item: "cube()",
            title: "Example 1",
            subtitle: "Basic",
            code,
            code_below,
            rel_url: Some("images/shapes/cube.png"),
            width: None,
            height: None,
        }
    }

    #[rstest]
    #[case(IndexPage::Toc, "TOC.md", "index.md")]
    #[case(IndexPage::Topics, "Topics.md", "topics.md")]
    #[case(IndexPage::AlphaIndex, "AlphaIndex.md", "alphaindex.md")]
    #[case(IndexPage::CheatSheet, "CheatSheet.md", "cheatsheet.md")]
    #[case(IndexPage::Sidebar, "_Sidebar.md", "_sidebar.md")]
    fn index_page_files(#[case] page: IndexPage, #[case] wiki: &str, #[case] mkdocs: &str) {
        assert_eq!(WikiTarget.page_file(page), wiki);
        assert_eq!(GitHubWikiTarget.page_file(page), wiki);
        assert_eq!(MkDocsTarget.page_file(page), mkdocs);
    }

    #[test]
    fn mkdocs_links_carry_suffix() {
        assert_eq!(MkDocsTarget.get_link("cube()", "function-cube", "shapes.scad", true), "[`cube()`](shapes.scad.md#function-cube)");
        assert_eq!(MkDocsTarget.get_link("Cubes", "section-cubes", "", false), "[Cubes](#section-cubes)");
    }

    #[test]
    fn wiki_image_block_puts_code_above_image() {
        let code = vec!["cube(10);".to_string()];
        let out = WikiTarget.image_block(&embed(&code, false));
        insta::assert_snapshot!(out.join("\n"), @r#"
        **Example 1:** Basic

        ``` {.C linenos=True}
        cube(10);
        ```

        ![cube() Example 1](images/shapes/cube.png "cube() Example 1")
        "#);
    }

    #[test]
    fn githubwiki_image_block_floats_image_left() {
        let code = vec!["cube(10);".to_string()];
        let out = GitHubWikiTarget.image_block(&embed(&code, false));
        insta::assert_snapshot!(out.join("\n"), @r#"
        **Example 1:** Basic

        <img align="left" alt="cube() Example 1" src="images/shapes/cube.png">

            cube(10);

        <br clear="all" /><br/>
        "#);
    }

    #[test]
    fn githubwiki_code_below_clears_float_first() {
        let code = vec!["cube(10);".to_string()];
        let out = GitHubWikiTarget.image_block(&embed(&code, true));
        assert_eq!(out[4], r#"<br clear="all" />"#);
        assert_eq!(out[6], "    cube(10);");
    }

    #[test]
    fn githubwiki_height_needs_width() {
        let code = vec![];
        let mut e = embed(&code, false);
        e.height = Some(100);
        assert_eq!(
            GitHubWikiTarget.image(&e, "a.png")[0],
            r#"<img align="left" alt="cube() Example 1" src="a.png">"#
        );
        e.width = Some(200);
        assert_eq!(
            GitHubWikiTarget.image(&e, "a.png")[0],
            r#"<img align="left" alt="cube() Example 1" src="a.png" width="200" height="100">"#
        );
    }

    #[test]
    fn githubwiki_alt_text_is_attribute_escaped() {
        let code = vec![];
        let mut e = embed(&code, false);
        e.item = "quote(\"a\")";
        assert_eq!(
            GitHubWikiTarget.image(&e, "a.png")[0],
            r#"<img align="left" alt="quote(&quot;a&quot;) Example 1" src="a.png">"#
        );
    }
}
