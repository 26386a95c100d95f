//! Named type declarations and in-place extension of canonical types.

use tracing::debug;

use netpolicy_core::{
    Attr, AttrContext, AttrTag, Attributes, BindError, IdentId, Span, TypeDecl, TypeRef, Value,
};

use crate::context::BindContext;

impl BindContext {
    /// Bind `id` as a name for `ty`.
    ///
    /// A record or enum that has never been named becomes the canonical
    /// definition under this name. Anything else is aliased through a
    /// shallow clone, and the clone stays reachable under the old name too.
    /// Returns the type now bound to the identifier.
    #[tracing::instrument(level = "debug", skip(self, ty, attrs), fields(ident = %id))]
    pub fn declare_type(&mut self, id: IdentId, ty: TypeRef, attrs: Option<Vec<Attr>>) -> TypeRef {
        let new_name = self.symbols.get(id).name().to_string();
        let old_name = ty.name();

        let canonical = (ty.is_record() || ty.is_enum()) && old_name.is_none();
        let tnew = if canonical { ty } else { ty.shallow_clone() };

        self.types.add_alias(&new_name, tnew.clone());
        if let Some(old) = old_name.as_deref()
            && old != new_name
        {
            self.types.add_alias(old, tnew.clone());
        }

        tnew.set_name(new_name.clone());
        let ident = self.symbols.get_mut(id);
        ident.set_type(tnew.clone());
        ident.make_type();

        if let Some(list) = attrs {
            let (checked, problems) = Attributes::checked(list, &tnew, AttrContext::default());
            for problem in problems {
                self.report(BindError::InvalidAttribute {
                    name: new_name.clone(),
                    tag: problem.tag,
                    reason: problem.reason,
                    span: Span::default(),
                });
            }
            self.symbols.get_mut(id).set_attrs(checked);
        }

        debug!(name = %new_name, canonical, alias_of = ?old_name, "type declared");
        tnew
    }

    /// Resolve a declared type name for an in-place extension.
    fn redef_target(&mut self, type_name: &str, span: Span) -> Option<TypeRef> {
        let module = self.current_module().to_string();
        let found = self
            .lookup_id(type_name, &module, false, false)
            .filter(|id| self.symbols.get(*id).is_type())
            .and_then(|id| self.symbols.get(id).ty().cloned());
        if found.is_none() {
            self.report(BindError::RedefOfUndeclared {
                name: type_name.to_string(),
                span,
            });
        }
        found
    }

    /// `redef record R += { ... }`: extend the canonical record in place.
    ///
    /// Added fields must be `&optional` or carry a `&default`, since values
    /// created before the extension have nothing to put there. Returns
    /// `true` if every field was added.
    pub fn redef_record(&mut self, type_name: &str, fields: Vec<TypeDecl>, span: Span) -> bool {
        let Some(ty) = self.redef_target(type_name, span) else {
            return false;
        };
        let Ok(record) = ty.as_record() else {
            self.report(BindError::RedefinitionTypeMismatch {
                name: type_name.to_string(),
                span,
            });
            return false;
        };

        let mut ok = true;
        let mut accepted: Vec<TypeDecl> = Vec::with_capacity(fields.len());
        for mut field in fields {
            let qualified = format!("{type_name}${}", field.id);
            if record.field_index(&field.id).is_some() || accepted.iter().any(|f| f.id == field.id) {
                ok = false;
                self.report(BindError::AlreadyDefined {
                    name: qualified,
                    span,
                });
                continue;
            }
            if let Some(attrs) = field.attrs.take() {
                let (checked, problems) = Attributes::checked(
                    attrs.iter().cloned(),
                    &field.ty,
                    AttrContext {
                        in_record: true,
                        is_global: false,
                    },
                );
                if !problems.is_empty() {
                    ok = false;
                    for problem in problems {
                        self.report(BindError::InvalidAttribute {
                            name: qualified.clone(),
                            tag: problem.tag,
                            reason: problem.reason,
                            span,
                        });
                    }
                    continue;
                }
                field.attrs = Some(checked);
            }
            if field.find_attr(AttrTag::Optional).is_none() && field.find_attr(AttrTag::Default).is_none() {
                ok = false;
                self.report(BindError::InvalidAttribute {
                    name: qualified,
                    tag: AttrTag::Optional,
                    reason: "extension fields must be &optional or have a &default".into(),
                    span,
                });
                continue;
            }
            accepted.push(field);
        }

        let added = accepted.len();
        record.add_fields(accepted);
        debug!(name = type_name, added, "record extended");
        ok
    }

    /// Add labels to an enum type and bind each as a constant global in
    /// `module`. Returns `true` if every label was new.
    pub fn add_enum_labels(
        &mut self,
        ty: &TypeRef,
        module: &str,
        labels: Vec<(String, Option<i64>)>,
        span: Span,
    ) -> bool {
        let Ok(et) = ty.as_enum() else {
            self.report(BindError::RedefinitionTypeMismatch {
                name: ty.name().unwrap_or_default(),
                span,
            });
            return false;
        };

        let mut ok = true;
        for (label, value) in labels {
            let id = self.global_in(module, &label);
            if et.lookup(&label).is_some() || self.symbols.get(id).ty().is_some() {
                ok = false;
                let name = self.symbols.get(id).name().to_string();
                self.report(BindError::AlreadyDefined { name, span });
                continue;
            }

            let v = et.add_label(label.as_str(), value);
            let ident = self.symbols.get_mut(id);
            ident.set_type(ty.clone());
            ident.set_val(Some(Value::Enum {
                label: label.as_str().into(),
                value: v,
            }));
            ident.set_const();
        }
        ok
    }

    /// `redef enum E += { ... }`.
    pub fn redef_enum(
        &mut self,
        type_name: &str,
        module: &str,
        labels: Vec<(String, Option<i64>)>,
        span: Span,
    ) -> bool {
        let Some(ty) = self.redef_target(type_name, span) else {
            return false;
        };
        self.add_enum_labels(&ty, module, labels, span)
    }
}
