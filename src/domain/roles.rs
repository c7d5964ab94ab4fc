text_enum! {
    Role {
        Customer => "customer",
        Vendor => "vendor",
        Coordinator => "coordinator",
        Admin => "admin",
    }
}

text_enum! {
    UserStatus {
        Active => "active",
        Suspended => "suspended",
    }
}

impl Role {
    /// Roles a visitor may pick for themselves at registration.
    pub fn self_assignable(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}
