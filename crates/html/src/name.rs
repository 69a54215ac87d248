// crates/html/src/name.rs

//! Tag keywords. Unknown tags keep their raw name and map to
//! [`Keyword::Other`].

/// Keywords for the tags the lexer tables and filters care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    A,
    Address,
    Area,
    Article,
    Aside,
    B,
    Base,
    Blockquote,
    Body,
    Br,
    Col,
    Colgroup,
    Dd,
    Dir,
    Div,
    Dl,
    Dt,
    Em,
    Fieldset,
    Font,
    Footer,
    Form,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Head,
    Header,
    Hgroup,
    Hr,
    Html,
    I,
    Iframe,
    Img,
    Input,
    Li,
    Link,
    Menu,
    Meta,
    Nav,
    Ol,
    Optgroup,
    Option,
    P,
    Param,
    Pre,
    Rp,
    Rt,
    Script,
    Section,
    Span,
    Style,
    Table,
    Tbody,
    Td,
    Textarea,
    Tfoot,
    Th,
    Thead,
    Tr,
    Ul,
    Wbr,
    Xml,
    Xmp,
    /// Any tag not in the table.
    Other,
}

const LOOKUP: &[(&str, Keyword)] = &[
    ("a", Keyword::A),
    ("address", Keyword::Address),
    ("area", Keyword::Area),
    ("article", Keyword::Article),
    ("aside", Keyword::Aside),
    ("b", Keyword::B),
    ("base", Keyword::Base),
    ("blockquote", Keyword::Blockquote),
    ("body", Keyword::Body),
    ("br", Keyword::Br),
    ("col", Keyword::Col),
    ("colgroup", Keyword::Colgroup),
    ("dd", Keyword::Dd),
    ("dir", Keyword::Dir),
    ("div", Keyword::Div),
    ("dl", Keyword::Dl),
    ("dt", Keyword::Dt),
    ("em", Keyword::Em),
    ("fieldset", Keyword::Fieldset),
    ("font", Keyword::Font),
    ("footer", Keyword::Footer),
    ("form", Keyword::Form),
    ("h1", Keyword::H1),
    ("h2", Keyword::H2),
    ("h3", Keyword::H3),
    ("h4", Keyword::H4),
    ("h5", Keyword::H5),
    ("h6", Keyword::H6),
    ("head", Keyword::Head),
    ("header", Keyword::Header),
    ("hgroup", Keyword::Hgroup),
    ("hr", Keyword::Hr),
    ("html", Keyword::Html),
    ("i", Keyword::I),
    ("iframe", Keyword::Iframe),
    ("img", Keyword::Img),
    ("input", Keyword::Input),
    ("li", Keyword::Li),
    ("link", Keyword::Link),
    ("menu", Keyword::Menu),
    ("meta", Keyword::Meta),
    ("nav", Keyword::Nav),
    ("ol", Keyword::Ol),
    ("optgroup", Keyword::Optgroup),
    ("option", Keyword::Option),
    ("p", Keyword::P),
    ("param", Keyword::Param),
    ("pre", Keyword::Pre),
    ("rp", Keyword::Rp),
    ("rt", Keyword::Rt),
    ("script", Keyword::Script),
    ("section", Keyword::Section),
    ("span", Keyword::Span),
    ("style", Keyword::Style),
    ("table", Keyword::Table),
    ("tbody", Keyword::Tbody),
    ("td", Keyword::Td),
    ("textarea", Keyword::Textarea),
    ("tfoot", Keyword::Tfoot),
    ("th", Keyword::Th),
    ("thead", Keyword::Thead),
    ("tr", Keyword::Tr),
    ("ul", Keyword::Ul),
    ("wbr", Keyword::Wbr),
    ("?xml", Keyword::Xml),
    ("xmp", Keyword::Xmp),
];

impl Keyword {
    /// Case-insensitive lookup; tag matching is case-insensitive even though
    /// raw names are preserved as written.
    pub fn lookup(name: &str) -> Keyword {
        let lower = name.to_ascii_lowercase();
        LOOKUP
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, k)| *k)
            .unwrap_or(Keyword::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("IMG"), Keyword::Img);
        assert_eq!(Keyword::lookup("Script"), Keyword::Script);
        assert_eq!(Keyword::lookup("blink"), Keyword::Other);
    }

    #[test]
    fn xml_prolog_is_a_keyword() {
        assert_eq!(Keyword::lookup("?xml"), Keyword::Xml);
    }
}
