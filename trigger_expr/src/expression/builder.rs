//! In-progress reference state
//!
//! A reference is opened by `{` and closed by `}`. References never nest,
//! so the scanner holds at most one `CurrentReference`, and `Region` says
//! which part of it the next character belongs to. Host, item and function
//! text are sliced from the expression by recorded offsets; only parameter
//! values are accumulated character by character.

use super::error::ExpressionErrorKind;
use super::reference::{ExpressionReference, FunctionReference};
use crate::utils::{Position, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    TopLevel,
    Host,
    UserMacro,
    Item,
    ItemParam,
    Function,
    FunctionParam,
}

impl Region {
    pub fn is_param_list(&self) -> bool {
        matches!(self, Region::ItemParam | Region::FunctionParam)
    }

    /// Opening and closing symbol of a parameter list region
    pub fn delimiters(&self) -> Option<(char, char)> {
        match self {
            Region::ItemParam => Some(('[', ']')),
            Region::FunctionParam => Some(('(', ')')),
            _ => None,
        }
    }

    /// The error reported for malformed parameters in this region
    pub fn syntax_error(&self) -> ExpressionErrorKind {
        match self {
            Region::FunctionParam | Region::Function => {
                ExpressionErrorKind::FunctionParameterSyntax
            }
            _ => ExpressionErrorKind::ItemParameterSyntax,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurrentReference {
    pub start: Position,
    pub region: Region,
    /// Byte offset of the host/item `:`
    colon: Option<usize>,
    /// Byte offsets of the function call parentheses
    paren_open: Option<usize>,
    paren_close: Option<usize>,
    item_params: Option<Vec<String>>,
    /// Values of the parameter list being scanned
    params: Vec<String>,
    /// Nesting of the list's own delimiter; 1 directly inside the list
    pub depth: usize,
    /// `{...}` nesting inside a parameter, e.g. a `{$MACRO}` argument
    pub macro_depth: usize,
    pub in_quotes: bool,
    pub quote_just_closed: bool,
}

impl CurrentReference {
    pub fn open(start: Position) -> Self {
        Self {
            start,
            region: Region::Host,
            colon: None,
            paren_open: None,
            paren_close: None,
            item_params: None,
            params: Vec::new(),
            depth: 0,
            macro_depth: 0,
            in_quotes: false,
            quote_just_closed: false,
        }
    }

    /// Nothing but `{` has been seen so far
    pub fn is_fresh(&self, pos: Position) -> bool {
        self.region == Region::Host && pos.offset == self.start.offset + 1
    }

    pub fn begin_item(&mut self, colon: usize) {
        self.colon = Some(colon);
        self.region = Region::Item;
    }

    pub fn has_item_params(&self) -> bool {
        self.item_params.is_some()
    }

    pub fn has_function(&self) -> bool {
        self.paren_open.is_some()
    }

    pub fn begin_item_params(&mut self) {
        self.region = Region::ItemParam;
        self.start_list();
    }

    pub fn end_item_params(&mut self) {
        self.item_params = Some(std::mem::take(&mut self.params));
        self.region = Region::Item;
        self.quote_just_closed = false;
    }

    pub fn begin_function_params(&mut self, paren: usize) {
        self.paren_open = Some(paren);
        self.region = Region::FunctionParam;
        self.start_list();
    }

    pub fn end_function_params(&mut self, paren: usize) {
        self.paren_close = Some(paren);
        self.region = Region::Function;
        self.quote_just_closed = false;
    }

    fn start_list(&mut self) {
        self.params = vec![String::new()];
        self.depth = 1;
        self.macro_depth = 0;
        self.quote_just_closed = false;
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The value of the parameter being scanned holds no text yet
    pub fn current_param_is_blank(&self) -> bool {
        self.params.last().map(|p| p.is_empty()).unwrap_or(true)
    }

    /// Parameter writer: append to the value of the current parameter
    pub fn write_param(&mut self, c: char) {
        if let Some(param) = self.params.last_mut() {
            param.push(c);
        }
    }

    /// An escaped quote replaces the backslash that escaped it
    pub fn write_escaped_quote(&mut self) {
        if let Some(param) = self.params.last_mut() {
            if param.ends_with('\\') {
                param.pop();
            }
            param.push('"');
        }
    }

    pub fn next_param(&mut self) {
        self.params.push(String::new());
        self.quote_just_closed = false;
    }

    /// Turn the finished reference into its public form. `end` is the
    /// position of the closing `}`.
    pub fn finish(self, expression: &str, end: Position) -> ExpressionReference {
        let inner_start = self.start.offset + 1;
        let text = slice(expression, self.start.offset, end.offset + 1);
        let span = Span::new(self.start, end.advance('}'));

        match self.region {
            Region::Host | Region::TopLevel => ExpressionReference::Macro {
                expression: text.clone(),
                name: text,
            },
            Region::UserMacro => ExpressionReference::UserMacro {
                expression: text.clone(),
                name: text,
            },
            _ => {
                let colon = self.colon.unwrap_or(inner_start);
                let host = slice(expression, inner_start, colon);
                let item_start = (colon + 1).min(end.offset);

                let (item, function_name, raw_params, function) = match self.paren_open {
                    Some(open) => {
                        let close = self.paren_close.unwrap_or(end.offset);
                        let item_and_name = slice(expression, item_start, open);
                        let (item, name) = split_function_name(&item_and_name);
                        let raw = slice(expression, open + 1, close);
                        let call = format!("{}({})", name, raw);
                        (item, name, raw, call)
                    }
                    None => (
                        slice(expression, item_start, end.offset),
                        String::new(),
                        String::new(),
                        String::new(),
                    ),
                };

                let function_params = if self.paren_open.is_some() {
                    self.params
                } else {
                    Vec::new()
                };

                ExpressionReference::HostItemFunction(FunctionReference {
                    expression: text,
                    host,
                    item,
                    item_params: self.item_params.unwrap_or_default(),
                    function,
                    function_name,
                    function_params,
                    raw_params,
                    span,
                })
            }
        }
    }
}

/// Split `item.key.function` at the last dot. Without a dot the whole text
/// is taken as the function name.
pub fn split_function_name(text: &str) -> (String, String) {
    match text.rfind('.') {
        Some(dot) => (text[..dot].to_string(), text[dot + 1..].to_string()),
        None => (String::new(), text.to_string()),
    }
}

fn slice(expression: &str, start: usize, end: usize) -> String {
    expression.get(start..end).unwrap_or_default().to_string()
}
