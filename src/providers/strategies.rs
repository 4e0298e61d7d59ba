//! 定位策略集
//!
//! 每个表单站点的"怪癖"都只是这里的一组有序候选选择器，
//! 新增站点或新的 DOM 变体只需要追加配置，不需要改提取逻辑。

/// 标签来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// 问题块自身的 `aria-labelledby` 指向的元素
    AriaLabelledBy,
    /// 问题块内第一个命中的元素
    Css(&'static str),
}

/// 选项文字来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionLabelSource {
    /// 最近的祖先 `<label>`
    ClosestLabel,
    /// `label[for=控件id]`
    LabelFor,
    /// 从父元素开始向上最多 `depth` 层，每层依次尝试选择器
    Ancestors {
        selectors: &'static [&'static str],
        depth: usize,
    },
}

/// 一个站点的完整定位策略
#[derive(Debug)]
pub struct LocatorStrategies {
    /// 表单容器候选，按优先级
    pub containers: &'static [&'static str],
    /// 问题块选择器（合并后按文档顺序）
    pub blocks: &'static [&'static str],
    pub labels: &'static [LabelSource],
    pub required_markers: &'static [&'static str],
    /// 文本输入候选，按优先级；每个候选只看第一个命中
    pub text_inputs: &'static [&'static str],
    pub radio_inputs: &'static str,
    pub checkbox_inputs: &'static str,
    pub option_labels: &'static [OptionLabelSource],
    pub dropdowns: &'static [&'static str],
    pub listbox_options: &'static str,
    /// 自定义下拉框旁边保存真实值的隐藏输入
    pub hidden_entry: &'static str,
}

/// 标签可接受的长度范围（字符数，闭区间）
pub const LABEL_MIN_CHARS: usize = 2;
pub const LABEL_MAX_CHARS: usize = 120;

/// 选项文字向上查找的最大层数
pub const OPTION_LABEL_DEPTH: usize = 3;

/// 新增节点命中这些选择器时视为表单结构发生变化
pub const STRUCTURAL_MARKERS: &[&str] = &[
    r#"div[role="listitem"]"#,
    "input[name]",
    "select[name]",
];

const SHARED_OPTION_TEXT: &[&str] = &[
    "label",
    "[data-text]",
    r#"span[dir="auto"]"#,
    ".aDTYNe",
    ".AB7Lab",
];

pub static GOOGLE_FORMS: LocatorStrategies = LocatorStrategies {
    containers: &["form", r#"[role="main"]"#],
    blocks: &[
        r#"div[role="listitem"]"#,
        r#"div[data-params*="entry"]"#,
        "div.freebirdFormviewerViewItemsItemItem",
        "div[jscontroller][data-value]",
    ],
    labels: &[
        LabelSource::Css(r#"div[role="heading"]"#),
        LabelSource::Css(".freebirdFormviewerViewItemsItemItemTitle"),
        LabelSource::Css(".M7eMe"),
        LabelSource::Css(".Xb9hP"),
        LabelSource::Css("span[jsname]"),
        LabelSource::Css(r#"span[dir="auto"]"#),
    ],
    required_markers: &[
        r#"[aria-required="true"]"#,
        ".freebirdFormviewerViewItemsItemRequiredAsterisk",
        r#"[data-required="true"]"#,
        ".required",
    ],
    text_inputs: &[
        r#"input[type="text"]"#,
        "textarea",
        "input.quantumWizTextinputPaperinputInput",
        "input[jsname][name]",
        "textarea[jsname][name]",
    ],
    radio_inputs: r#"input[type="radio"][name]"#,
    checkbox_inputs: r#"input[type="checkbox"][name]"#,
    option_labels: &[OptionLabelSource::Ancestors {
        selectors: SHARED_OPTION_TEXT,
        depth: OPTION_LABEL_DEPTH,
    }],
    dropdowns: &[
        "select[name]",
        r#"div[role="listbox"]"#,
        ".quantumWizMenuPaperselectEl",
    ],
    listbox_options: r#"[role="option"]"#,
    hidden_entry: r#"input[type="hidden"][name]"#,
};

pub static MICROSOFT_FORMS: LocatorStrategies = LocatorStrategies {
    containers: &["form", "body"],
    blocks: &[
        r#"[role="group"]"#,
        "div[aria-labelledby]",
        r#"div[class*="question"]"#,
        r#"div[data-automation-id*="question"]"#,
    ],
    labels: &[
        LabelSource::AriaLabelledBy,
        LabelSource::Css(
            r#"label, [role="heading"], .question-title, h1, h2, h3, [data-automation-id*="questionTitle"]"#,
        ),
    ],
    required_markers: &[
        r#"[aria-required="true"]"#,
        ".required",
        r#"[data-required="true"]"#,
    ],
    text_inputs: &[r#"input[type="text"][name], textarea[name]"#],
    radio_inputs: r#"input[type="radio"][name]"#,
    checkbox_inputs: r#"input[type="checkbox"][name]"#,
    option_labels: &[OptionLabelSource::ClosestLabel],
    dropdowns: &["select[name]", r#"[role="listbox"]"#],
    listbox_options: r#"[role="option"]"#,
    hidden_entry: r#"input[type="hidden"][name]"#,
};

pub static GENERIC: LocatorStrategies = LocatorStrategies {
    containers: &["form"],
    blocks: &[
        "fieldset",
        r#"[role="group"]"#,
        r#"[role="radiogroup"]"#,
        ".form-group",
        ".form-field",
        ".field",
        "p",
        "li",
    ],
    labels: &[
        LabelSource::AriaLabelledBy,
        LabelSource::Css("legend"),
        LabelSource::Css("label"),
        LabelSource::Css(r#"[role="heading"]"#),
        LabelSource::Css("h1, h2, h3, h4, h5, h6"),
    ],
    required_markers: &[
        "[required]",
        r#"[aria-required="true"]"#,
        r#"[data-required="true"]"#,
        ".required",
    ],
    text_inputs: &[
        r#"input[type="text"]"#,
        "input:not([type])",
        r#"input[type="email"]"#,
        r#"input[type="tel"]"#,
        r#"input[type="url"]"#,
        r#"input[type="number"]"#,
        r#"input[type="search"]"#,
        r#"input[type="date"]"#,
        "textarea",
    ],
    radio_inputs: r#"input[type="radio"][name]"#,
    checkbox_inputs: r#"input[type="checkbox"][name]"#,
    option_labels: &[
        OptionLabelSource::ClosestLabel,
        OptionLabelSource::LabelFor,
        OptionLabelSource::Ancestors {
            selectors: &["label", "span"],
            depth: OPTION_LABEL_DEPTH,
        },
    ],
    dropdowns: &["select[name]", r#"[role="listbox"]"#],
    listbox_options: r#"[role="option"]"#,
    hidden_entry: r#"input[type="hidden"][name]"#,
};
