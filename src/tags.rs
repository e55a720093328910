//! The fixed enumeration of known HTML tag names, plus the void-element and
//! raw-text-element classifications the walker and serializer consult.

macro_rules! define_tags {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A known HTML5 tag, or the `Unknown` sentinel for anything else.
        ///
        /// `Policy::flags` is indexed by every variant here except `Unknown`, which always
        /// behaves as "disallowed, unwrap" regardless of policy configuration (there is
        /// nothing sensible to allow-list for a tag name the policy doesn't recognize).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum Tag {
            $($variant,)+
            /// A tag name outside the known enumeration. The caller-supplied, lowercased
            /// source name is kept alongside the node in a side field (see
            /// [`crate::tree::NodeKind::Element`]).
            Unknown,
        }

        /// Number of known tags, not counting [`Tag::Unknown`].
        pub const KNOWN_TAG_COUNT: usize = define_tags!(@count $($variant)+);

        /// All known tags, not counting [`Tag::Unknown`], in declaration order.
        pub const ALL_TAGS: [Tag; KNOWN_TAG_COUNT] = [$(Tag::$variant,)+];

        impl Tag {
            /// The lowercase, normalized tag name. Returns `""` for [`Tag::Unknown`]; use
            /// the element's side field for the original source name in that case.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Tag::$variant => $name,)+
                    Tag::Unknown => "",
                }
            }

            /// Looks up a tag by its lowercased name, falling back to [`Tag::Unknown`].
            pub fn from_name(name: &str) -> Tag {
                match name {
                    $($name => Tag::$variant,)+
                    _ => Tag::Unknown,
                }
            }
        }
    };
    (@count $($t:ident)+) => { <[()]>::len(&[$(define_tags!(@unit $t)),+]) };
    (@unit $t:ident) => { () };
}

define_tags! {
    A => "a",
    Abbr => "abbr",
    Acronym => "acronym",
    Address => "address",
    Area => "area",
    Article => "article",
    Aside => "aside",
    Audio => "audio",
    B => "b",
    Base => "base",
    Bdi => "bdi",
    Bdo => "bdo",
    Big => "big",
    Blockquote => "blockquote",
    Body => "body",
    Br => "br",
    Button => "button",
    Canvas => "canvas",
    Caption => "caption",
    Center => "center",
    Cite => "cite",
    Code => "code",
    Col => "col",
    Colgroup => "colgroup",
    Data => "data",
    Datalist => "datalist",
    Dd => "dd",
    Del => "del",
    Details => "details",
    Dfn => "dfn",
    Dialog => "dialog",
    Div => "div",
    Dl => "dl",
    Dt => "dt",
    Em => "em",
    Embed => "embed",
    Fieldset => "fieldset",
    Figcaption => "figcaption",
    Figure => "figure",
    Footer => "footer",
    Form => "form",
    H1 => "h1",
    H2 => "h2",
    H3 => "h3",
    H4 => "h4",
    H5 => "h5",
    H6 => "h6",
    Head => "head",
    Header => "header",
    Hgroup => "hgroup",
    Hr => "hr",
    Html => "html",
    I => "i",
    Iframe => "iframe",
    Img => "img",
    Input => "input",
    Ins => "ins",
    Kbd => "kbd",
    Label => "label",
    Legend => "legend",
    Li => "li",
    Link => "link",
    Main => "main",
    Map => "map",
    Mark => "mark",
    Marquee => "marquee",
    Math => "math",
    Menu => "menu",
    Menuitem => "menuitem",
    Meta => "meta",
    Meter => "meter",
    Nav => "nav",
    Noembed => "noembed",
    Noframes => "noframes",
    Noscript => "noscript",
    Object => "object",
    Ol => "ol",
    Optgroup => "optgroup",
    Option => "option",
    Output => "output",
    P => "p",
    Param => "param",
    Picture => "picture",
    Plaintext => "plaintext",
    Pre => "pre",
    Progress => "progress",
    Q => "q",
    Rp => "rp",
    Rt => "rt",
    Rtc => "rtc",
    Ruby => "ruby",
    S => "s",
    Samp => "samp",
    Script => "script",
    Section => "section",
    Select => "select",
    Slot => "slot",
    Small => "small",
    Source => "source",
    Span => "span",
    Strike => "strike",
    Strong => "strong",
    Style => "style",
    Sub => "sub",
    Summary => "summary",
    Sup => "sup",
    Svg => "svg",
    Table => "table",
    Tbody => "tbody",
    Td => "td",
    Template => "template",
    Textarea => "textarea",
    Tfoot => "tfoot",
    Th => "th",
    Thead => "thead",
    Time => "time",
    Title => "title",
    Tr => "tr",
    Track => "track",
    Tt => "tt",
    U => "u",
    Ul => "ul",
    Var => "var",
    Video => "video",
    Wbr => "wbr",
    Xmp => "xmp",
}

/// The HTML5 fixed list of void elements: these never have children and are serialized
/// without a closing tag.
pub fn is_void(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::Area
            | Tag::Base
            | Tag::Br
            | Tag::Col
            | Tag::Embed
            | Tag::Hr
            | Tag::Img
            | Tag::Input
            | Tag::Link
            | Tag::Meta
            | Tag::Source
            | Tag::Track
            | Tag::Wbr
    )
}

/// RCDATA/RAWTEXT elements: their text-node children are serialized without escaping.
pub fn is_raw_text(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::Title
            | Tag::Textarea
            | Tag::Script
            | Tag::Style
            | Tag::Xmp
            | Tag::Iframe
            | Tag::Noembed
            | Tag::Noframes
            | Tag::Noscript
            | Tag::Plaintext
    )
}
